// 该文件是 Huoyan （火眼） 项目的一部分。
// src/task.rs - 检测任务
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

use std::time::Instant;

use anyhow::Context;
use tracing::{debug, info};

use crate::{
  frame::RgbNhwcFrame,
  input::ImageLoader,
  letterbox::check_img_size,
  model::{DetectItem, DetectModel, DetectResult},
  output::Render,
  postprocess::{NmsConfig, non_max_suppression, scale_coords},
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

const DEFAULT_IMG_SIZE: u32 = 640;

/// 单张图像检测：加载、推理、NMS、还原坐标、渲染
#[derive(Debug, Clone)]
pub struct OneShotTask {
  pub img_size: u32,
  pub nms: NmsConfig,
}

impl Default for OneShotTask {
  fn default() -> Self {
    Self {
      img_size: DEFAULT_IMG_SIZE,
      nms: NmsConfig::default(),
    }
  }
}

impl OneShotTask {
  pub fn new(img_size: u32, nms: NmsConfig) -> Self {
    Self { img_size, nms }
  }

  /// 对一帧原图执行检测，结果坐标位于原图像素空间
  pub fn detect<M>(&self, model: &M, frame: &RgbNhwcFrame) -> anyhow::Result<DetectResult>
  where
    M: DetectModel,
    M::Error: std::error::Error + Send + Sync + 'static,
  {
    let stride = model.stride();
    let img_size = check_img_size(self.img_size, stride)?;
    let loaded = ImageLoader::new(img_size, stride)
      .load(frame)
      .context("图像预处理失败")?;
    let input_shape = loaded.input_shape();
    let image_shape = loaded.original_shape();

    let now = Instant::now();
    let prediction = model.infer(&loaded.tensor)?;
    debug!(
      "模型输出 {} 个候选框，{} 个类别",
      prediction.num_candidates(),
      prediction.num_classes()
    );
    let detections = non_max_suppression(prediction.view(), &self.nms)?;
    let elapsed = now.elapsed();

    let mut boxes: Vec<[f32; 4]> = detections.iter().map(|det| det.bbox).collect();
    scale_coords(input_shape, &mut boxes, image_shape, None);

    let names = model.class_names();
    let items = detections
      .iter()
      .zip(boxes)
      .map(|(det, bbox)| DetectItem {
        class_id: det.class_id,
        class_name: names.name(det.class_id),
        score: det.score,
        bbox: bbox.map(f32::round),
      })
      .collect();

    Ok(DetectResult {
      items,
      input_shape,
      image_shape,
      elapsed,
    })
  }
}

impl<I, M, O, RE> Task<I, M, O> for OneShotTask
where
  I: Iterator<Item = RgbNhwcFrame>,
  M: DetectModel,
  M::Error: std::error::Error + Send + Sync + 'static,
  O: Render<RgbNhwcFrame, DetectResult, Error = RE>,
  RE: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功: {}x{}，开始推理...", frame.width(), frame.height());

    let result = self.detect(&model, &frame)?;
    info!(
      "{}Done. ({:.3}s)",
      result.summary(),
      result.elapsed.as_secs_f64()
    );
    for item in result.items.iter() {
      debug!(
        "{} {:.2} [{:.0}, {:.0}, {:.0}, {:.0}]",
        item.class_name, item.score, item.bbox[0], item.bbox[1], item.bbox[2], item.bbox[3]
      );
    }

    let now = Instant::now();
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}
