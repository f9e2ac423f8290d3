// 该文件是 Huoyan （火眼） 项目的一部分。
// src/input/loader.rs - 单张图像加载器
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
use tracing::debug;

use crate::{
  frame::{RgbNchwFrame, RgbNhwcFrame},
  letterbox::{Letterbox, LetterboxError, LetterboxOptions, letterbox},
};

/// 加载结果：模型输入张量、原图及 letterbox 参数
#[derive(Debug, Clone)]
pub struct LoadedImage {
  pub tensor: RgbNchwFrame,
  pub original: RgbImage,
  pub letterbox: Letterbox,
}

impl LoadedImage {
  /// 原图尺寸 (高, 宽)
  pub fn original_shape(&self) -> (u32, u32) {
    (self.original.height(), self.original.width())
  }

  /// 模型输入尺寸 (高, 宽)
  pub fn input_shape(&self) -> (u32, u32) {
    self.letterbox.shape
  }
}

#[derive(Debug, Clone)]
pub struct ImageLoader {
  img_size: u32,
  options: LetterboxOptions,
}

impl ImageLoader {
  pub fn new(img_size: u32, stride: u32) -> Self {
    Self {
      img_size,
      options: LetterboxOptions {
        stride,
        ..Default::default()
      },
    }
  }

  pub fn with_options(mut self, options: LetterboxOptions) -> Self {
    self.options = options;
    self
  }

  pub fn img_size(&self) -> u32 {
    self.img_size
  }

  pub fn load(&self, frame: &RgbNhwcFrame) -> Result<LoadedImage, LetterboxError> {
    if frame.is_empty() {
      return Err(LetterboxError::EmptyImage(frame.width() as u32, frame.height() as u32));
    }

    let original = frame.to_rgb_image();
    let (padded, letterbox) = letterbox(&original, (self.img_size, self.img_size), &self.options)?;
    let tensor = RgbNchwFrame::from(&padded);
    debug!(
      "图像加载完成: 原图 {}x{}, 输入 {}x{}",
      original.width(),
      original.height(),
      tensor.width(),
      tensor.height()
    );

    Ok(LoadedImage {
      tensor,
      original,
      letterbox,
    })
  }
}
