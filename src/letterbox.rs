// 该文件是 Huoyan （火眼） 项目的一部分。
// src/letterbox.rs - 等比缩放并填充到模型输入尺寸
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

use image::{Rgb, RgbImage, imageops};
use thiserror::Error;
use tracing::{debug, warn};

const LETTERBOX_PAD_COLOR: [u8; 3] = [114, 114, 114];
const DEFAULT_STRIDE: u32 = 32;

#[derive(Error, Debug, PartialEq)]
pub enum LetterboxError {
  #[error("图像为空: {0}x{1}")]
  EmptyImage(u32, u32),
  #[error("目标尺寸无效: {0}x{1}")]
  InvalidTarget(u32, u32),
  #[error("步长必须大于 0")]
  ZeroStride,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxOptions {
  pub color: [u8; 3],
  /// 最小矩形：只填充到步长的整数倍
  pub auto: bool,
  /// 拉伸填满，不保持宽高比
  pub scale_fill: bool,
  /// 允许放大小图
  pub scale_up: bool,
  pub stride: u32,
}

impl Default for LetterboxOptions {
  fn default() -> Self {
    Self {
      color: LETTERBOX_PAD_COLOR,
      auto: true,
      scale_fill: false,
      scale_up: true,
      stride: DEFAULT_STRIDE,
    }
  }
}

/// letterbox 变换参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
  /// (宽, 高) 方向缩放比例
  pub ratio: (f32, f32),
  /// (x, y) 方向单侧填充
  pub pad: (f32, f32),
  /// 填充后图像尺寸 (高, 宽)
  pub shape: (u32, u32),
}

impl Letterbox {
  /// 供 `scale_coords` 使用的 `(gain, pad)`
  pub fn ratio_pad(&self) -> ((f32, f32), (f32, f32)) {
    (self.ratio, self.pad)
  }

  /// 把原图坐标系下的 xyxy 框映射到填充后的坐标系
  pub fn project(&self, bbox: [f32; 4]) -> [f32; 4] {
    [
      bbox[0] * self.ratio.0 + self.pad.0,
      bbox[1] * self.ratio.1 + self.pad.1,
      bbox[2] * self.ratio.0 + self.pad.0,
      bbox[3] * self.ratio.1 + self.pad.1,
    ]
  }
}

pub fn make_divisible(x: u32, divisor: u32) -> u32 {
  x.div_ceil(divisor) * divisor
}

/// 把输入尺寸调整为步长的整数倍
pub fn check_img_size(img_size: u32, stride: u32) -> Result<u32, LetterboxError> {
  if stride == 0 {
    return Err(LetterboxError::ZeroStride);
  }

  let new_size = make_divisible(img_size, stride);
  if new_size != img_size {
    warn!(
      "输入尺寸 {} 必须是最大步长 {} 的倍数，已调整为 {}",
      img_size, stride, new_size
    );
  }
  Ok(new_size)
}

/// 等比缩放并填充，`new_shape` 为 (高, 宽)
pub fn letterbox(
  image: &RgbImage,
  new_shape: (u32, u32),
  options: &LetterboxOptions,
) -> Result<(RgbImage, Letterbox), LetterboxError> {
  let (w0, h0) = image.dimensions();
  if w0 == 0 || h0 == 0 {
    return Err(LetterboxError::EmptyImage(w0, h0));
  }
  let (new_h, new_w) = new_shape;
  if new_w == 0 || new_h == 0 {
    return Err(LetterboxError::InvalidTarget(new_w, new_h));
  }
  if options.auto && options.stride == 0 {
    return Err(LetterboxError::ZeroStride);
  }

  let mut r = (new_h as f32 / h0 as f32).min(new_w as f32 / w0 as f32);
  if !options.scale_up {
    r = r.min(1.0);
  }

  let mut ratio = (r, r);
  let mut unpad_w = ((w0 as f32 * r).round_ties_even() as u32).max(1);
  let mut unpad_h = ((h0 as f32 * r).round_ties_even() as u32).max(1);
  let mut dw = new_w.saturating_sub(unpad_w) as f32;
  let mut dh = new_h.saturating_sub(unpad_h) as f32;

  if options.auto {
    dw %= options.stride as f32;
    dh %= options.stride as f32;
  } else if options.scale_fill {
    dw = 0.0;
    dh = 0.0;
    unpad_w = new_w;
    unpad_h = new_h;
    ratio = (new_w as f32 / w0 as f32, new_h as f32 / h0 as f32);
  }

  dw /= 2.0;
  dh /= 2.0;

  let resized = if (w0, h0) != (unpad_w, unpad_h) {
    imageops::resize(image, unpad_w, unpad_h, imageops::FilterType::Triangle)
  } else {
    image.clone()
  };

  let top = (dh - 0.1).round() as u32;
  let bottom = (dh + 0.1).round() as u32;
  let left = (dw - 0.1).round() as u32;
  let right = (dw + 0.1).round() as u32;

  let out_w = unpad_w + left + right;
  let out_h = unpad_h + top + bottom;
  let mut padded = RgbImage::from_pixel(out_w, out_h, Rgb(options.color));
  imageops::replace(&mut padded, &resized, left as i64, top as i64);

  debug!(
    "letterbox: {}x{} -> {}x{}, 比例 {:?}, 填充 ({:.1}, {:.1})",
    w0, h0, out_w, out_h, ratio, dw, dh
  );

  Ok((
    padded,
    Letterbox {
      ratio,
      pad: (dw, dh),
      shape: (out_h, out_w),
    },
  ))
}
