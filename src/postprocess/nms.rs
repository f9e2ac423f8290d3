// 该文件是 Huoyan （火眼） 项目的一部分。
// src/postprocess/nms.rs - 非极大值抑制
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

use ndarray::ArrayView2;
use thiserror::Error;
use tracing::{debug, warn};

use super::coords::xywh2xyxy;

// 类别偏移量，保证不同类别的框互不重叠
const MAX_WH: f32 = 4096.0;
// 进入 NMS 的最大候选数
const MAX_NMS: usize = 30000;
// x, y, w, h, objectness
const BOX_ATTRS: usize = 5;

#[derive(Error, Debug, PartialEq)]
pub enum NmsError {
  #[error("预测张量宽度 {0} 不足，至少需要 {min} 列", min = BOX_ATTRS + 1)]
  TooFewColumns(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NmsConfig {
  pub conf_thres: f32,
  pub iou_thres: f32,
  /// 只保留这些类别
  pub classes: Option<Vec<usize>>,
  /// 类别无关的 NMS
  pub agnostic: bool,
  /// 每个框允许多个类别
  pub multi_label: bool,
  pub max_det: usize,
}

impl Default for NmsConfig {
  fn default() -> Self {
    Self {
      conf_thres: 0.25,
      iou_thres: 0.45,
      classes: None,
      agnostic: false,
      multi_label: false,
      max_det: 300,
    }
  }
}

/// NMS 输出，bbox 为 [x_min, y_min, x_max, y_max]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
  pub bbox: [f32; 4],
  pub score: f32,
  pub class_id: usize,
}

pub fn box_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a[2] - a[0]) * (a[3] - a[1]);
  let area_b = (b[2] - b[0]) * (b[3] - b[1]);
  let union = area_a + area_b - intersection;

  if union > 0.0 {
    intersection / union
  } else {
    0.0
  }
}

/// 对单张图的原始预测执行置信度过滤与 NMS
///
/// `prediction` 每行为 `[cx, cy, w, h, obj, cls_0, ..., cls_{nc-1}]`，坐标位于模型输入空间。
/// 结果按置信度降序排列。
pub fn non_max_suppression(
  prediction: ArrayView2<f32>,
  config: &NmsConfig,
) -> Result<Vec<Detection>, NmsError> {
  let cols = prediction.ncols();
  if cols <= BOX_ATTRS {
    return Err(NmsError::TooFewColumns(cols));
  }
  let num_classes = cols - BOX_ATTRS;
  let multi_label = config.multi_label && num_classes > 1;

  let mut candidates = Vec::new();
  for row in prediction.rows() {
    let objectness = row[4];
    if !(objectness > config.conf_thres) {
      continue;
    }

    let bbox = xywh2xyxy([row[0], row[1], row[2], row[3]]);

    if multi_label {
      for class_id in 0..num_classes {
        let score = row[BOX_ATTRS + class_id] * objectness;
        if score > config.conf_thres {
          candidates.push(Detection {
            bbox,
            score,
            class_id,
          });
        }
      }
    } else {
      let mut class_id = 0usize;
      let mut max_score = f32::MIN;
      for c in 0..num_classes {
        let score = row[BOX_ATTRS + c];
        if score > max_score {
          max_score = score;
          class_id = c;
        }
      }
      let score = max_score * objectness;
      if score > config.conf_thres {
        candidates.push(Detection {
          bbox,
          score,
          class_id,
        });
      }
    }
  }

  if let Some(classes) = &config.classes {
    candidates.retain(|det| classes.contains(&det.class_id));
  }

  if candidates.is_empty() {
    return Ok(candidates);
  }

  candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
  if candidates.len() > MAX_NMS {
    warn!("候选框数量 {} 超过上限 {}，已截断", candidates.len(), MAX_NMS);
    candidates.truncate(MAX_NMS);
  }

  let offset = |det: &Detection| {
    let c = if config.agnostic {
      0.0
    } else {
      det.class_id as f32 * MAX_WH
    };
    [det.bbox[0] + c, det.bbox[1] + c, det.bbox[2] + c, det.bbox[3] + c]
  };
  let shifted: Vec<[f32; 4]> = candidates.iter().map(offset).collect();

  let mut keep = Vec::new();
  let mut suppressed = vec![false; candidates.len()];
  for i in 0..candidates.len() {
    if keep.len() >= config.max_det {
      break;
    }
    if suppressed[i] {
      continue;
    }
    keep.push(candidates[i]);
    for j in (i + 1)..candidates.len() {
      if !suppressed[j] && box_iou(&shifted[i], &shifted[j]) > config.iou_thres {
        suppressed[j] = true;
      }
    }
  }

  debug!(
    "NMS: {} 个候选框，保留 {} 个",
    candidates.len(),
    keep.len()
  );
  Ok(keep)
}

#[cfg(test)]
mod tests {
  use super::*;
  use ndarray::{Array2, array};

  #[test]
  fn iou_of_partial_overlap() {
    let iou = box_iou(&[0.0, 0.0, 10.0, 10.0], &[5.0, 5.0, 15.0, 15.0]);
    assert!((iou - 25.0 / 175.0).abs() < 1e-6);
    assert_eq!(box_iou(&[0.0, 0.0, 1.0, 1.0], &[2.0, 2.0, 3.0, 3.0]), 0.0);
  }

  #[test]
  fn overlapping_boxes_of_same_class_are_suppressed() {
    let pred = array![
      [50.0, 50.0, 20.0, 20.0, 0.9, 0.9, 0.1],
      [52.0, 52.0, 20.0, 20.0, 0.8, 0.9, 0.1],
      [150.0, 150.0, 20.0, 20.0, 0.7, 0.9, 0.1],
    ];
    let dets = non_max_suppression(pred.view(), &NmsConfig::default()).unwrap();
    assert_eq!(dets.len(), 2);
    assert!((dets[0].score - 0.81).abs() < 1e-6);
    assert_eq!(dets[0].bbox, [40.0, 40.0, 60.0, 60.0]);
    assert!((dets[1].score - 0.63).abs() < 1e-6);
  }

  #[test]
  fn different_classes_survive_unless_agnostic() {
    let pred = array![
      [50.0, 50.0, 20.0, 20.0, 0.9, 0.9, 0.1],
      [51.0, 51.0, 20.0, 20.0, 0.9, 0.1, 0.8],
    ];
    let dets = non_max_suppression(pred.view(), &NmsConfig::default()).unwrap();
    assert_eq!(dets.len(), 2);
    assert_eq!(dets[0].class_id, 0);
    assert_eq!(dets[1].class_id, 1);

    let agnostic = NmsConfig {
      agnostic: true,
      ..Default::default()
    };
    let dets = non_max_suppression(pred.view(), &agnostic).unwrap();
    assert_eq!(dets.len(), 1);
    assert_eq!(dets[0].class_id, 0);
  }

  #[test]
  fn low_objectness_and_low_class_score_are_dropped() {
    let pred = array![
      [50.0, 50.0, 20.0, 20.0, 0.2, 1.0, 0.0],
      [90.0, 90.0, 20.0, 20.0, 0.5, 0.4, 0.3],
      [200.0, 200.0, 20.0, 20.0, 0.6, 0.5, 0.1],
    ];
    let dets = non_max_suppression(pred.view(), &NmsConfig::default()).unwrap();
    assert_eq!(dets.len(), 1);
    assert!((dets[0].score - 0.3).abs() < 1e-6);
  }

  #[test]
  fn class_filter_keeps_only_requested_classes() {
    let pred = array![
      [50.0, 50.0, 20.0, 20.0, 0.9, 0.9, 0.1, 0.0],
      [150.0, 150.0, 20.0, 20.0, 0.9, 0.0, 0.1, 0.9],
    ];
    let config = NmsConfig {
      classes: Some(vec![2]),
      ..Default::default()
    };
    let dets = non_max_suppression(pred.view(), &config).unwrap();
    assert_eq!(dets.len(), 1);
    assert_eq!(dets[0].class_id, 2);
  }

  #[test]
  fn multi_label_emits_every_class_above_threshold() {
    let pred = array![[50.0, 50.0, 20.0, 20.0, 1.0, 0.9, 0.6, 0.1]];
    let config = NmsConfig {
      multi_label: true,
      ..Default::default()
    };
    let dets = non_max_suppression(pred.view(), &config).unwrap();
    assert_eq!(dets.len(), 2);
    assert_eq!(dets[0].class_id, 0);
    assert_eq!(dets[1].class_id, 1);
  }

  #[test]
  fn max_det_truncates_result() {
    let mut pred = Array2::<f32>::zeros((10, 6));
    for i in 0..10 {
      pred[[i, 0]] = 30.0 * i as f32;
      pred[[i, 1]] = 10.0;
      pred[[i, 2]] = 10.0;
      pred[[i, 3]] = 10.0;
      pred[[i, 4]] = 0.5 + i as f32 * 0.01;
      pred[[i, 5]] = 1.0;
    }
    let config = NmsConfig {
      max_det: 3,
      ..Default::default()
    };
    let dets = non_max_suppression(pred.view(), &config).unwrap();
    assert_eq!(dets.len(), 3);
    assert!(dets.windows(2).all(|w| w[0].score >= w[1].score));
    assert!((dets[0].score - 0.59).abs() < 1e-6);
  }

  #[test]
  fn zero_max_det_keeps_nothing() {
    let pred = array![[50.0, 50.0, 20.0, 20.0, 0.9, 0.9, 0.1]];
    let config = NmsConfig {
      max_det: 0,
      ..Default::default()
    };
    assert!(non_max_suppression(pred.view(), &config).unwrap().is_empty());
  }

  #[test]
  fn empty_prediction_and_bad_width() {
    let empty = Array2::<f32>::zeros((0, 85));
    assert!(non_max_suppression(empty.view(), &NmsConfig::default()).unwrap().is_empty());

    let narrow = Array2::<f32>::zeros((3, 5));
    assert_eq!(
      non_max_suppression(narrow.view(), &NmsConfig::default()),
      Err(NmsError::TooFewColumns(5))
    );
  }
}
