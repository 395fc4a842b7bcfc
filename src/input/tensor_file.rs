// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/tensor_file.rs - 原始张量文件输入
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

use std::path::{Path, PathBuf};

use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{RawTensor, TensorFrame},
  input::InputError,
  url_path,
};

/// 读取一个小端序 f32 文件，图像标识取文件名（不含扩展名）
pub(crate) fn read_tensor_file(path: &Path) -> Result<TensorFrame, InputError> {
  let bytes = std::fs::read(path)?;
  let tensor = RawTensor::from_le_bytes(&bytes).ok_or_else(|| InputError::TruncatedTensor {
    path: path.display().to_string(),
    len: bytes.len(),
  })?;
  let id = path
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string());
  debug!("读取张量 {}: {} 个值", id, tensor.len());
  Ok(TensorFrame { id, tensor })
}

/// 单个原始张量文件
pub struct TensorFileInput {
  frame: Option<TensorFrame>,
}

impl FromUrlWithScheme for TensorFileInput {
  const SCHEME: &'static str = "tensor";
}

impl FromUrl for TensorFileInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(InputError::SchemeMismatch);
    }

    let path = PathBuf::from(url_path(url));
    let frame = read_tensor_file(&path)?;
    Ok(TensorFileInput { frame: Some(frame) })
  }
}

impl Iterator for TensorFileInput {
  type Item = TensorFrame;

  fn next(&mut self) -> Option<Self::Item> {
    self.frame.take()
  }
}
