// 该文件是 Huoyan （火眼） 项目的一部分。
// src/model/labels.rs - 类别名称
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

use std::path::Path;

use serde_json::Value;
use tracing::warn;

// 元数据中允许的最大类别编号（不含）
const MAX_CLASS_ID: usize = 4096;

/// COCO 数据集类别名称
pub const COCO_CLASSES: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ClassNames {
  names: Vec<String>,
}

impl Default for ClassNames {
  fn default() -> Self {
    Self::coco()
  }
}

impl ClassNames {
  pub fn coco() -> Self {
    Self::new(COCO_CLASSES.iter().map(|s| s.to_string()).collect())
  }

  pub fn new(names: Vec<String>) -> Self {
    Self { names }
  }

  /// 每行一个类别名，忽略空行
  pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
    let content = std::fs::read_to_string(path)?;
    Ok(Self::new(
      content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect(),
    ))
  }

  /// 解析模型元数据中的 `names`
  ///
  /// 支持 JSON 数组、JSON 对象以及 Python 字典字面量 `{0: 'person', 1: 'bicycle'}`。
  pub fn parse_metadata(raw: &str) -> Option<Self> {
    let names = match serde_json::from_str::<Value>(raw) {
      Ok(value) => Self::from_json(&value),
      Err(_) => Self::from_python_dict(raw),
    };
    names.filter(|names| !names.is_empty())
  }

  fn from_json(value: &Value) -> Option<Self> {
    match value {
      Value::Array(items) => items
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .map(Self::new),
      Value::Object(map) => {
        let pairs = map
          .iter()
          .map(|(k, v)| Some((k.trim().parse::<usize>().ok()?, v.as_str()?.to_string())))
          .collect::<Option<Vec<_>>>()?;
        Self::from_pairs(pairs)
      }
      _ => None,
    }
  }

  fn from_python_dict(raw: &str) -> Option<Self> {
    let body = raw.trim().strip_prefix('{')?.strip_suffix('}')?;
    let mut pairs = Vec::new();
    let mut rest = body;

    loop {
      rest = rest.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
      if rest.is_empty() {
        break;
      }

      let (key, after_key) = rest.split_once(':')?;
      let id = key.trim().parse::<usize>().ok()?;
      let after_key = after_key.trim_start();

      let quote = after_key.chars().next().filter(|c| *c == '\'' || *c == '"')?;
      let (name, after_value) = parse_quoted(&after_key[quote.len_utf8()..], quote)?;
      pairs.push((id, name));
      rest = after_value;
    }

    Self::from_pairs(pairs)
  }

  // 编号不连续时以 `class{id}` 填补，编号过大时拒绝
  fn from_pairs(mut pairs: Vec<(usize, String)>) -> Option<Self> {
    pairs.sort_by_key(|(id, _)| *id);
    let len = match pairs.last() {
      Some((id, _)) => id.checked_add(1)?,
      None => 0,
    };
    if len > MAX_CLASS_ID {
      warn!("元数据中的类别编号 {} 超出上限 {}", len - 1, MAX_CLASS_ID);
      return None;
    }

    let mut names: Vec<String> = (0..len).map(|id| format!("class{}", id)).collect();
    for (id, name) in pairs {
      names[id] = name;
    }
    Some(Self::new(names))
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn name(&self, class_id: usize) -> String {
    self
      .names
      .get(class_id)
      .cloned()
      .unwrap_or_else(|| format!("class{}", class_id))
  }
}

/// 读取引号内的字符串直到匹配的结束引号，支持反斜杠转义，返回内容与剩余部分
fn parse_quoted(s: &str, quote: char) -> Option<(String, &str)> {
  let mut value = String::new();
  let mut chars = s.char_indices();
  while let Some((i, c)) = chars.next() {
    match c {
      '\\' => {
        let (_, escaped) = chars.next()?;
        value.push(match escaped {
          'n' => '\n',
          't' => '\t',
          other => other,
        });
      }
      c if c == quote => return Some((value, &s[i + c.len_utf8()..])),
      c => value.push(c),
    }
  }
  None
}
