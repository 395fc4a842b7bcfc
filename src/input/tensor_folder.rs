// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/tensor_folder.rs - 目录批量张量输入
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

use std::{collections::VecDeque, path::PathBuf};

use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::TensorFrame,
  input::{InputError, tensor_file::read_tensor_file},
  url_path,
};

const TENSOR_EXTENSIONS: [&str; 2] = ["bin", "f32"];

/// 目录中所有 `*.bin` / `*.f32` 文件，按文件名排序后逐个读取
pub struct TensorFolderInput {
  pending: VecDeque<PathBuf>,
}

impl FromUrlWithScheme for TensorFolderInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for TensorFolderInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(InputError::SchemeMismatch);
    }

    let directory = PathBuf::from(url_path(url));
    let mut files = Vec::new();
    for entry in std::fs::read_dir(&directory)? {
      let path = entry?.path();
      let matched = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| TENSOR_EXTENSIONS.contains(&e))
        .unwrap_or(false);
      if path.is_file() && matched {
        files.push(path);
      }
    }
    files.sort();

    info!("目录 {} 中找到 {} 个张量文件", directory.display(), files.len());
    Ok(TensorFolderInput {
      pending: files.into(),
    })
  }
}

impl Iterator for TensorFolderInput {
  type Item = TensorFrame;

  fn next(&mut self) -> Option<Self::Item> {
    while let Some(path) = self.pending.pop_front() {
      match read_tensor_file(&path) {
        Ok(frame) => return Some(frame),
        Err(e) => {
          error!("读取张量文件 {} 失败: {}", path.display(), e);
          continue;
        }
      }
    }
    None
  }
}
