// 该文件是 Huoyan （火眼） 项目的一部分。
// src/main.rs - 单张图像目标检测程序
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use url::Url;

use huoyan::{
  FromUrl,
  input::InputWrapper,
  model::{DetectModel, YoloOnnxBuilder},
  output::{Draw, OutputWrapper, Palette, load_font},
  postprocess::NmsConfig,
  task::{OneShotTask, Task},
};

/// Huoyan 单张图像目标检测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型，例如 yolov5:///path/yolov5s.onnx?warmup
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源，例如 image:///path/bus.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径，例如 image:///path/out.jpg?txt&conf
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 推理尺寸（像素）
  #[arg(long, default_value_t = 640)]
  pub img_size: u32,
  /// 置信度阈值
  #[arg(long, default_value_t = 0.25)]
  pub conf_thres: f32,
  /// NMS 的 IoU 阈值
  #[arg(long, default_value_t = 0.45)]
  pub iou_thres: f32,
  /// 每张图最多保留的检测数
  #[arg(long, default_value_t = 300)]
  pub max_det: usize,
  /// 只保留这些类别，例如 --classes 0 2 3
  #[arg(long, num_args = 1..)]
  pub classes: Option<Vec<usize>>,
  /// 类别无关的 NMS
  #[arg(long)]
  pub agnostic_nms: bool,
  /// 每个框允许多个类别
  #[arg(long)]
  pub multi_label: bool,
  /// 边框线宽，0 表示按图像尺寸推算
  #[arg(long, default_value_t = 3)]
  pub line_thickness: u32,
  /// 不绘制标签
  #[arg(long)]
  pub hide_labels: bool,
  /// 标签中不显示置信度
  #[arg(long)]
  pub hide_conf: bool,
  /// 标签字体文件（TTF/OTF），未指定时只绘制边框
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,
  /// 配色随机种子
  #[arg(long)]
  pub seed: Option<u64>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = InputWrapper::from_url(&args.input).context("无法打开输入")?;
  let model = YoloOnnxBuilder::from_url(&args.model)?
    .img_size(args.img_size)
    .build()
    .context("无法加载模型")?;

  let font = args
    .font
    .as_deref()
    .map(load_font)
    .transpose()
    .context("无法加载字体")?;
  let draw = Draw::default()
    .with_line_thickness(Some(args.line_thickness))
    .with_hide_labels(args.hide_labels)
    .with_hide_conf(args.hide_conf)
    .with_font(font)
    .with_palette(Palette::new(model.class_names().len(), args.seed));
  let output = OutputWrapper::from_url(&args.output)
    .context("无法创建输出")?
    .with_draw(draw);

  let task = OneShotTask::new(
    args.img_size,
    NmsConfig {
      conf_thres: args.conf_thres,
      iou_thres: args.iou_thres,
      classes: args.classes,
      agnostic: args.agnostic_nms,
      multi_label: args.multi_label,
      max_det: args.max_det,
    },
  );
  task.run_task(input.into_nhwc(), model, output)?;

  Ok(())
}
