// 该文件是 Huoyan （火眼） 项目的一部分。
// src/postprocess/coords.rs - 坐标变换
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

/// [中心x, 中心y, 宽, 高] -> [x_min, y_min, x_max, y_max]
pub fn xywh2xyxy(b: [f32; 4]) -> [f32; 4] {
  [
    b[0] - b[2] / 2.0,
    b[1] - b[3] / 2.0,
    b[0] + b[2] / 2.0,
    b[1] + b[3] / 2.0,
  ]
}

/// [x_min, y_min, x_max, y_max] -> [中心x, 中心y, 宽, 高]
pub fn xyxy2xywh(b: [f32; 4]) -> [f32; 4] {
  [
    (b[0] + b[2]) / 2.0,
    (b[1] + b[3]) / 2.0,
    b[2] - b[0],
    b[3] - b[1],
  ]
}

/// 把 xyxy 框裁剪到图像范围内，`shape` 为 (高, 宽)
pub fn clip_coords(bbox: &mut [f32; 4], shape: (u32, u32)) {
  let (h, w) = (shape.0 as f32, shape.1 as f32);
  bbox[0] = bbox[0].clamp(0.0, w);
  bbox[1] = bbox[1].clamp(0.0, h);
  bbox[2] = bbox[2].clamp(0.0, w);
  bbox[3] = bbox[3].clamp(0.0, h);
}

/// 把 `img1_shape`（填充后）坐标系下的 xyxy 框还原到 `img0_shape`（原图）坐标系
///
/// 两个形状均为 (高, 宽)。未给出 `ratio_pad` 时由两个形状推算缩放与填充。
pub fn scale_coords(
  img1_shape: (u32, u32),
  boxes: &mut [[f32; 4]],
  img0_shape: (u32, u32),
  ratio_pad: Option<((f32, f32), (f32, f32))>,
) {
  let (gain, pad) = match ratio_pad {
    Some((ratio, pad)) => (ratio.0, pad),
    None => {
      let (h1, w1) = (img1_shape.0 as f32, img1_shape.1 as f32);
      let (h0, w0) = (img0_shape.0 as f32, img0_shape.1 as f32);
      let gain = (h1 / h0).min(w1 / w0);
      (gain, ((w1 - w0 * gain) / 2.0, (h1 - h0 * gain) / 2.0))
    }
  };

  for bbox in boxes.iter_mut() {
    bbox[0] = (bbox[0] - pad.0) / gain;
    bbox[1] = (bbox[1] - pad.1) / gain;
    bbox[2] = (bbox[2] - pad.0) / gain;
    bbox[3] = (bbox[3] - pad.1) / gain;
    clip_coords(bbox, img0_shape);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::letterbox::{LetterboxOptions, letterbox};
  use image::RgbImage;

  fn assert_box_eq(a: [f32; 4], b: [f32; 4]) {
    for i in 0..4 {
      assert!((a[i] - b[i]).abs() < 1e-3, "{:?} != {:?}", a, b);
    }
  }

  #[test]
  fn xywh_and_xyxy_are_inverse() {
    let xyxy = xywh2xyxy([50.0, 40.0, 20.0, 10.0]);
    assert_eq!(xyxy, [40.0, 35.0, 60.0, 45.0]);
    assert_eq!(xyxy2xywh(xyxy), [50.0, 40.0, 20.0, 10.0]);
  }

  #[test]
  fn clip_coords_clamps_to_width_and_height() {
    let mut bbox = [-5.0, -1.0, 700.0, 500.0];
    clip_coords(&mut bbox, (480, 640));
    assert_eq!(bbox, [0.0, 0.0, 640.0, 480.0]);
  }

  #[test]
  fn scale_coords_removes_padding_then_gain() {
    // 720x1280 的原图在 384x640 的输入中，gain = 0.5，上下各填充 12
    let mut boxes = [[100.0, 62.0, 300.0, 162.0]];
    scale_coords((384, 640), &mut boxes, (720, 1280), None);
    assert_box_eq(boxes[0], [200.0, 100.0, 600.0, 300.0]);
  }

  #[test]
  fn scale_coords_inverts_letterbox_projection() {
    let options = LetterboxOptions::default();
    for &(w0, h0) in &[(1280u32, 720u32), (810, 1080), (500, 333), (640, 640)] {
      let (_, lb) = letterbox(&RgbImage::new(w0, h0), (640, 640), &options).unwrap();
      let original = [w0 as f32 * 0.1, h0 as f32 * 0.2, w0 as f32 * 0.7, h0 as f32 * 0.9];
      let mut boxes = [lb.project(original)];
      scale_coords(lb.shape, &mut boxes, (h0, w0), None);
      let tolerance = 1.0 / lb.ratio.0;
      for i in 0..4 {
        assert!(
          (boxes[0][i] - original[i]).abs() <= tolerance,
          "{}x{}: {:?} vs {:?}",
          w0,
          h0,
          boxes[0],
          original
        );
      }
    }
  }

  #[test]
  fn scale_coords_uses_explicit_ratio_pad() {
    let mut boxes = [[20.0, 30.0, 40.0, 50.0]];
    scale_coords((0, 0), &mut boxes, (1000, 1000), Some(((2.0, 2.0), (10.0, 10.0))));
    assert_box_eq(boxes[0], [5.0, 10.0, 15.0, 20.0]);
  }

  #[test]
  fn scale_coords_clips_boxes_in_padding() {
    let mut boxes = [[-10.0, 0.0, 650.0, 20.0]];
    scale_coords((384, 640), &mut boxes, (720, 1280), None);
    assert_box_eq(boxes[0], [0.0, 0.0, 1280.0, 16.0]);
  }
}
