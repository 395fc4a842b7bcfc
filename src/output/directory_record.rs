// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use chrono::{Datelike, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{Detection, DetectionSet},
  output::Render,
  url_path,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("帧计数器已损坏")]
  Poisoned,
}

impl<T> From<PoisonError<T>> for DirectoryRecordOutputError {
  fn from(_: PoisonError<T>) -> Self {
    DirectoryRecordOutputError::Poisoned
  }
}

pub struct Record {
  pub label_with_name: bool,
}

impl Record {
  pub fn format(&self, items: &[Detection]) -> String {
    items
      .iter()
      .map(|item| {
        let name = if self.label_with_name {
          item.label.clone()
        } else {
          item.class_index.to_string()
        };
        format!(
          "{}, {:.4}, {}, {}, {}, {}",
          name, item.confidence, item.rect.x, item.rect.y, item.rect.width, item.rect.height
        )
      })
      .collect::<Vec<_>>()
      .join("\n")
  }

  pub fn record(&self, items: &[Detection], path: &Path) -> Result<(), std::io::Error> {
    std::fs::write(path, self.format(items))
  }
}

/// 图像标识中的路径分隔符替换为 `_`，记录文件只能落在日期目录内
fn file_stem_of(image: &str) -> String {
  image
    .chars()
    .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
    .collect()
}

/// 按日期分目录，为每张图像写一个文本记录
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  record: Record,
  frame_counter: Mutex<u16>,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let label_with_name = !uri
      .query_pairs()
      .any(|(k, v)| k == "record" && v == "id");
    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(url_path(uri)),
      record: Record { label_with_name },
      frame_counter: Mutex::new(0),
      always,
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> Result<u16, DirectoryRecordOutputError> {
    let mut counter = self.frame_counter.lock()?;
    let id = counter.wrapping_add(1);
    *counter = id;
    Ok(id)
  }

  fn frame_path(&self, image: &str) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    Ok(directory.join(format!(
      "{}-{:04X}-{}.txt",
      now.format("%H-%M-%S"),
      self.frame_id()?,
      file_stem_of(image)
    )))
  }
}

impl Render<DetectionSet> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, result: &DetectionSet) -> Result<(), Self::Error> {
    for (image, outcome) in result.iter() {
      match outcome {
        Ok(items) if self.always || !items.is_empty() => {
          let path = self.frame_path(image)?;
          debug!("记录图像 {} 的 {} 个检测结果到 {}", image, items.len(), path.display());
          self.record.record(items, &path)?;
        }
        Ok(_) => {}
        Err(e) => warn!("图像 {} 没有可记录的结果: {}", image, e),
      }
    }
    Ok(())
  }
}
