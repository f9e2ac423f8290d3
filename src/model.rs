// 该文件是 Huoyan （火眼） 项目的一部分。
// src/model.rs - 模型
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

use std::collections::BTreeMap;
use std::time::Duration;

use ndarray::{Array2, ArrayView2};

use crate::frame::RgbNchwFrame;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 目标检测模型：输入 NCHW 张量帧，输出单张图的原始预测
pub trait DetectModel: Model<Input = RgbNchwFrame, Output = RawPrediction> {
  /// 最大下采样步长
  fn stride(&self) -> u32;
  fn class_names(&self) -> &ClassNames;
}

impl<M: Model> Model for &M {
  type Input = M::Input;
  type Output = M::Output;
  type Error = M::Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    (**self).infer(input)
  }
}

impl<M: DetectModel> DetectModel for &M {
  fn stride(&self) -> u32 {
    (**self).stride()
  }

  fn class_names(&self) -> &ClassNames {
    (**self).class_names()
  }
}

/// 单张图的原始预测，形状为 `[N, 5 + nc]`
#[derive(Debug, Clone)]
pub struct RawPrediction {
  data: Array2<f32>,
}

impl RawPrediction {
  pub fn new(data: Array2<f32>) -> Self {
    Self { data }
  }

  pub fn view(&self) -> ArrayView2<'_, f32> {
    self.data.view()
  }

  pub fn num_candidates(&self) -> usize {
    self.data.nrows()
  }

  pub fn num_classes(&self) -> usize {
    self.data.ncols().saturating_sub(5)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  pub class_id: usize,
  pub class_name: String,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，原图像素坐标
}

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  /// 按置信度降序
  pub items: Box<[DetectItem]>,
  /// 模型输入尺寸 (高, 宽)
  pub input_shape: (u32, u32),
  /// 原图尺寸 (高, 宽)
  pub image_shape: (u32, u32),
  /// 推理与 NMS 耗时
  pub elapsed: Duration,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  /// 按类别编号升序统计 (类别编号, 类别名, 数量)
  pub fn count_by_class(&self) -> Vec<(usize, &str, usize)> {
    let mut counts: BTreeMap<usize, (&str, usize)> = BTreeMap::new();
    for item in self.items.iter() {
      counts
        .entry(item.class_id)
        .or_insert((item.class_name.as_str(), 0))
        .1 += 1;
    }
    counts
      .into_iter()
      .map(|(id, (name, n))| (id, name, n))
      .collect()
  }

  /// 形如 `384x640 2 persons, 1 bus, ` 的摘要
  pub fn summary(&self) -> String {
    let mut s = format!("{}x{} ", self.input_shape.0, self.input_shape.1);
    for (_, name, n) in self.count_by_class() {
      s.push_str(&format!("{} {}{}, ", n, name, if n > 1 { "s" } else { "" }));
    }
    s
  }
}

mod labels;
mod yolov5;
pub use self::labels::{COCO_CLASSES, ClassNames};
pub use self::yolov5::{YoloOnnx, YoloOnnxBuilder, YoloOnnxError};
