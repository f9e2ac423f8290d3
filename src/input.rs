// 该文件是 Huoyan （火眼） 项目的一部分。
// src/input.rs - 图像输入
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

use thiserror::Error;

use crate::{FromUrl, frame::RgbNhwcFrame};

pub use crate::frame::ChannelOrder;

mod loader;
pub use self::loader::{ImageLoader, LoadedImage};

mod memory_image;
pub use self::memory_image::{MemoryImageInput, MemoryImageInputError, MemoryImageInputNhwc};

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError, ImageFileInputNhwc};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[error("Memory image input error: {0}")]
  MemoryImageInputError(#[from] MemoryImageInputError),
  #[error("URI scheme mismatch")]
  SchemeMismatch,
}

pub enum InputWrapper {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImageFileInput),
  Memory(MemoryImageInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ImageFileInput::SCHEME {
        let input = ImageFileInput::from_url(url)?;
        return Ok(InputWrapper::ReadImageFile(input));
      }
    }
    tracing::error!("不支持的输入方案: {}", url.scheme());
    Err(InputError::SchemeMismatch)
  }
}

impl From<MemoryImageInput> for InputWrapper {
  fn from(input: MemoryImageInput) -> Self {
    InputWrapper::Memory(input)
  }
}

impl InputWrapper {
  pub fn into_nhwc(self) -> InputWrapperNhwcIter {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(input) => InputWrapperNhwcIter::ReadImageFile(input.into_nhwc()),
      InputWrapper::Memory(input) => InputWrapperNhwcIter::Memory(input.into_nhwc()),
    }
  }
}

pub enum InputWrapperNhwcIter {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImageFileInputNhwc),
  Memory(MemoryImageInputNhwc),
}

impl Iterator for InputWrapperNhwcIter {
  type Item = RgbNhwcFrame;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapperNhwcIter::ReadImageFile(input) => input.next(),
      InputWrapperNhwcIter::Memory(input) => input.next(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::ChannelOrder;

  #[test]
  fn unknown_scheme_is_rejected() {
    let url = url::Url::parse("rtsp://camera.local/stream").unwrap();
    assert!(matches!(InputWrapper::from_url(&url), Err(InputError::SchemeMismatch)));
  }

  #[test]
  fn memory_input_yields_one_frame_through_wrapper() {
    let input = MemoryImageInput::from_raw(2, 1, vec![0, 0, 255, 0, 255, 0], ChannelOrder::Bgr).unwrap();
    let mut frames = InputWrapper::from(input).into_nhwc();
    let frame = frames.next().unwrap();
    assert_eq!(frame.as_nhwc(), &[255, 0, 0, 0, 255, 0]);
    assert!(frames.next().is_none());
  }
}
