// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/json_tensor.rs - JSON 张量输入
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

use std::collections::{BTreeMap, btree_map};

use tracing::debug;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{RawTensor, TensorFrame},
  input::InputError,
  url_path,
};

/// `{ "图像标识": [f32, ...], ... }` 形式的 JSON 文件
pub struct JsonTensorInput {
  frames: btree_map::IntoIter<String, Vec<f32>>,
}

impl FromUrlWithScheme for JsonTensorInput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonTensorInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(InputError::SchemeMismatch);
    }

    let text = std::fs::read_to_string(url_path(url))?;
    let frames: BTreeMap<String, Vec<f32>> = serde_json::from_str(&text)?;
    debug!("JSON 输入包含 {} 张图像", frames.len());
    Ok(JsonTensorInput {
      frames: frames.into_iter(),
    })
  }
}

impl Iterator for JsonTensorInput {
  type Item = TensorFrame;

  fn next(&mut self) -> Option<Self::Item> {
    self.frames.next().map(|(id, values)| TensorFrame {
      id,
      tensor: RawTensor::from(values),
    })
  }
}
