// 该文件是 Huoyan （火眼） 项目的一部分。
// src/output/palette.rs - 类别配色
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

use rand::{Rng, SeedableRng, rngs::StdRng};

const FALLBACK_COLOR: [u8; 3] = [0, 0, 255];

/// 每个类别一种随机颜色
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
  colors: Vec<[u8; 3]>,
}

impl Palette {
  /// `seed` 为 `None` 时使用系统熵源
  pub fn new(num_classes: usize, seed: Option<u64>) -> Self {
    let mut rng = match seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_os_rng(),
    };
    let colors = (0..num_classes)
      .map(|_| {
        [
          rng.random_range(0..=255u8),
          rng.random_range(0..=255u8),
          rng.random_range(0..=255u8),
        ]
      })
      .collect();
    Self { colors }
  }

  pub fn from_colors(colors: Vec<[u8; 3]>) -> Self {
    Self { colors }
  }

  pub fn len(&self) -> usize {
    self.colors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.colors.is_empty()
  }

  /// 超出范围的类别循环取色
  pub fn color(&self, class_id: usize) -> [u8; 3] {
    if self.colors.is_empty() {
      return FALLBACK_COLOR;
    }
    self.colors[class_id % self.colors.len()]
  }
}
