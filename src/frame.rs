// 该文件是 Huoyan （火眼） 项目的一部分。
// src/frame.rs - NHWC 原图帧与 NCHW 张量帧定义
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

use image::{ImageBuffer, Rgb, RgbImage};
use ndarray::Array4;

const RGB_CHANNELS: usize = 3;

/// 颜色通道顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
  #[default]
  Rgb,
  /// OpenCV 风格的 BGR 排列
  Bgr,
}

/// 原始图像帧，交错排列的 RGB 字节（HWC）
#[derive(Debug, Clone)]
pub struct RgbNhwcFrame {
  height: usize,
  width: usize,
  data: Box<[u8]>,
}

impl RgbNhwcFrame {
  pub fn with_shape(height: usize, width: usize) -> Self {
    let data = vec![0u8; RGB_CHANNELS * height * width].into_boxed_slice();
    Self {
      height,
      width,
      data,
    }
  }

  /// 由原始字节构造，长度不匹配时返回 `None`；BGR 数据会被转换为 RGB
  pub fn from_raw(height: usize, width: usize, mut data: Vec<u8>, order: ChannelOrder) -> Option<Self> {
    if data.len() != RGB_CHANNELS * height * width {
      return None;
    }

    if order == ChannelOrder::Bgr {
      for pixel in data.chunks_exact_mut(RGB_CHANNELS) {
        pixel.swap(0, 2);
      }
    }

    Some(Self {
      height,
      width,
      data: data.into_boxed_slice(),
    })
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn is_empty(&self) -> bool {
    self.height == 0 || self.width == 0
  }

  pub fn as_nhwc(&self) -> &[u8] {
    &self.data
  }

  pub fn to_rgb_image(&self) -> RgbImage {
    let width = self.width;
    let data = &self.data;

    ImageBuffer::from_fn(self.width as u32, self.height as u32, |x, y| {
      let idx = (y as usize * width + x as usize) * RGB_CHANNELS;
      Rgb([data[idx], data[idx + 1], data[idx + 2]])
    })
  }
}

impl AsMut<[u8]> for RgbNhwcFrame {
  fn as_mut(&mut self) -> &mut [u8] {
    &mut self.data
  }
}

impl From<RgbImage> for RgbNhwcFrame {
  fn from(image: RgbImage) -> Self {
    let (width, height) = image.dimensions();
    Self {
      height: height as usize,
      width: width as usize,
      data: image.into_raw().into_boxed_slice(),
    }
  }
}

/// 送入模型的张量帧，形状为 `[1, 3, H, W]`，数值归一化到 `[0, 1]`
#[derive(Debug, Clone)]
pub struct RgbNchwFrame {
  tensor: Array4<f32>,
}

impl RgbNchwFrame {
  pub fn zeros(height: usize, width: usize) -> Self {
    Self {
      tensor: Array4::zeros((1, RGB_CHANNELS, height, width)),
    }
  }

  pub fn height(&self) -> usize {
    self.tensor.shape()[2]
  }

  pub fn width(&self) -> usize {
    self.tensor.shape()[3]
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn as_nchw(&self) -> &Array4<f32> {
    &self.tensor
  }

  pub fn into_nchw(self) -> Array4<f32> {
    self.tensor
  }
}

impl From<&RgbImage> for RgbNchwFrame {
  fn from(image: &RgbImage) -> Self {
    let (width, height) = image.dimensions();
    let mut frame = RgbNchwFrame::zeros(height as usize, width as usize);

    for (x, y, pixel) in image.enumerate_pixels() {
      for c in 0..RGB_CHANNELS {
        frame.tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
      }
    }
    frame
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn from_raw_rejects_wrong_length() {
    assert!(RgbNhwcFrame::from_raw(2, 2, vec![0; 11], ChannelOrder::Rgb).is_none());
    assert!(RgbNhwcFrame::from_raw(2, 2, vec![0; 12], ChannelOrder::Rgb).is_some());
  }

  #[test]
  fn bgr_input_is_swapped_to_rgb() {
    let frame = RgbNhwcFrame::from_raw(1, 2, vec![1, 2, 3, 4, 5, 6], ChannelOrder::Bgr).unwrap();
    assert_eq!(frame.as_nhwc(), &[3, 2, 1, 6, 5, 4]);

    let image = frame.to_rgb_image();
    assert_eq!(image.dimensions(), (2, 1));
    assert_eq!(image.get_pixel(1, 0), &Rgb([6, 5, 4]));
  }

  #[test]
  fn rgb_image_round_trips_through_nhwc() {
    let image = RgbImage::from_fn(3, 2, |x, y| Rgb([x as u8, y as u8, 7]));
    let frame = RgbNhwcFrame::from(image.clone());
    assert_eq!((frame.height(), frame.width()), (2, 3));
    assert_eq!(frame.to_rgb_image(), image);
  }

  #[test]
  fn nchw_tensor_is_planar_and_normalized() {
    let image = RgbImage::from_fn(2, 1, |x, _| if x == 0 { Rgb([255, 0, 51]) } else { Rgb([0, 255, 0]) });
    let frame = RgbNchwFrame::from(&image);
    let tensor = frame.as_nchw();

    assert_eq!(tensor.shape(), &[1, 3, 1, 2]);
    assert_eq!(tensor[[0, 0, 0, 0]], 1.0);
    assert_eq!(tensor[[0, 1, 0, 1]], 1.0);
    assert!((tensor[[0, 2, 0, 0]] - 0.2).abs() < 1e-6);
    assert_eq!(tensor[[0, 0, 0, 1]], 0.0);
  }
}
