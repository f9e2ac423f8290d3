// 该文件是 Huoyan （火眼） 项目的一部分。
// src/input/memory_image.rs - 内存图像输入
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

use image::RgbImage;
use thiserror::Error;

use crate::frame::{ChannelOrder, RgbNhwcFrame};

#[derive(Error, Debug, PartialEq)]
pub enum MemoryImageInputError {
  #[error("像素数据长度不匹配: 期望 {expected}, 实际 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("图像为空")]
  Empty,
}

/// 已解码的交错像素缓冲区（例如来自其他解码器的 BGR 数据）
pub struct MemoryImageInput {
  frame: Option<RgbNhwcFrame>,
}

impl MemoryImageInput {
  pub fn from_raw(
    width: usize,
    height: usize,
    data: Vec<u8>,
    order: ChannelOrder,
  ) -> Result<Self, MemoryImageInputError> {
    if width == 0 || height == 0 {
      return Err(MemoryImageInputError::Empty);
    }
    let actual = data.len();
    let frame = RgbNhwcFrame::from_raw(height, width, data, order).ok_or(
      MemoryImageInputError::LengthMismatch {
        expected: width * height * 3,
        actual,
      },
    )?;
    Ok(Self { frame: Some(frame) })
  }

  pub fn from_rgb_image(image: RgbImage) -> Result<Self, MemoryImageInputError> {
    if image.width() == 0 || image.height() == 0 {
      return Err(MemoryImageInputError::Empty);
    }
    Ok(Self {
      frame: Some(RgbNhwcFrame::from(image)),
    })
  }

  pub fn into_nhwc(self) -> MemoryImageInputNhwc {
    MemoryImageInputNhwc { inner: self }
  }
}

pub struct MemoryImageInputNhwc {
  inner: MemoryImageInput,
}

impl Iterator for MemoryImageInputNhwc {
  type Item = RgbNhwcFrame;

  fn next(&mut self) -> Option<Self::Item> {
    self.inner.frame.take()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn rejects_wrong_length_and_empty() {
    assert_eq!(
      MemoryImageInput::from_raw(2, 2, vec![0; 11], ChannelOrder::Rgb).err(),
      Some(MemoryImageInputError::LengthMismatch {
        expected: 12,
        actual: 11
      })
    );
    assert_eq!(
      MemoryImageInput::from_raw(0, 2, vec![], ChannelOrder::Bgr).err(),
      Some(MemoryImageInputError::Empty)
    );
  }

  #[test]
  fn rgb_image_passes_through_unchanged() {
    let image = RgbImage::from_pixel(3, 2, Rgb([1, 2, 3]));
    let mut frames = MemoryImageInput::from_rgb_image(image).unwrap().into_nhwc();
    let frame = frames.next().unwrap();
    assert_eq!((frame.height(), frame.width()), (2, 3));
    assert_eq!(&frame.as_nhwc()[..3], &[1, 2, 3]);
    assert!(frames.next().is_none());
  }
}
