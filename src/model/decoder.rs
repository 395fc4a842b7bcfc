// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/decoder.rs - 网格检测输出解码器
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

use std::str::FromStr;

use rayon::prelude::*;
use serde::Deserialize;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{RawTensor, TensorFrame},
  model::{
    ConfigError, DecodeError, Detection, DetectionSet, ImageResult, Model, WithLabel,
    anchor::AnchorTable,
    geometry::{BoxLogits, map_box},
    layout::{Feature, LayoutConfig},
    nms::{ParamsError, SuppressionParams, suppress},
    palette::ColorTable,
    scorer::{ClassScorer, LabelTable},
  },
  url_path,
};

pub const GRID_SCHEME: &str = "grid";

/// JSON 配置文件，所有字段均可省略
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct GridConfigFile {
  rows: Option<usize>,
  columns: Option<usize>,
  classes: Option<usize>,
  boxes_per_cell: Option<usize>,
  cell_width: Option<u32>,
  cell_height: Option<u32>,
  anchors: Option<Vec<Vec<f32>>>,
  labels: Option<Vec<String>>,
  colors: Option<Vec<[u8; 3]>>,
  confidence: Option<f32>,
  max_boxes: Option<usize>,
  max_overlap: Option<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct GridDecoderBuilder {
  layout: LayoutConfig,
  anchors: Option<AnchorTable>,
  labels: LabelTable,
  colors: ColorTable,
  params: SuppressionParams,
}

impl FromUrlWithScheme for GridDecoderBuilder {
  const SCHEME: &'static str = GRID_SCHEME;
}

impl FromUrl for GridDecoderBuilder {
  type Error = ConfigError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ConfigError::SchemeMismatch {
        expected: Self::SCHEME,
        actual: url.scheme().to_string(),
      });
    }

    let mut builder = GridDecoderBuilder::default();

    let path = url_path(url);
    if !path.is_empty() && path != "/" {
      info!("加载解码配置文件: {}", path);
      let text = std::fs::read_to_string(&path)?;
      let file: GridConfigFile = serde_json::from_str(&text)?;
      builder = builder.apply_file(file)?;
    }

    for (key, value) in url.query_pairs() {
      builder = builder.apply_query(&key, &value)?;
    }

    Ok(builder)
  }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
  value.trim().parse().map_err(|_| ConfigError::InvalidValue {
    key: key.to_string(),
    value: value.to_string(),
  })
}

fn parse_list<T: FromStr>(key: &str, value: &str) -> Result<Vec<T>, ConfigError> {
  value
    .split(',')
    .filter(|s| !s.trim().is_empty())
    .map(|s| parse_value(key, s))
    .collect()
}

impl GridDecoderBuilder {
  pub fn layout(mut self, layout: LayoutConfig) -> Self {
    self.layout = layout;
    self
  }

  pub fn anchors(mut self, anchors: AnchorTable) -> Self {
    self.anchors = Some(anchors);
    self
  }

  pub fn labels(mut self, labels: LabelTable) -> Self {
    self.labels = labels;
    self
  }

  pub fn colors(mut self, colors: ColorTable) -> Self {
    self.colors = colors;
    self
  }

  pub fn params(mut self, params: SuppressionParams) -> Self {
    self.params = params;
    self
  }

  pub fn current_params(&self) -> &SuppressionParams {
    &self.params
  }

  fn apply_file(mut self, file: GridConfigFile) -> Result<Self, ConfigError> {
    let layout = &mut self.layout;
    layout.row_count = file.rows.unwrap_or(layout.row_count);
    layout.column_count = file.columns.unwrap_or(layout.column_count);
    layout.class_count = file.classes.unwrap_or(layout.class_count);
    layout.boxes_per_cell = file.boxes_per_cell.unwrap_or(layout.boxes_per_cell);
    layout.cell_width = file.cell_width.unwrap_or(layout.cell_width);
    layout.cell_height = file.cell_height.unwrap_or(layout.cell_height);

    if let Some(anchors) = file.anchors {
      self.anchors = Some(AnchorTable::from_pairs(&anchors)?);
    }
    if let Some(labels) = file.labels {
      self.labels = labels.into_iter().collect();
    }
    if let Some(colors) = file.colors {
      self.colors = ColorTable::from(colors);
    }

    let params = &mut self.params;
    params.confidence_threshold = file.confidence.unwrap_or(params.confidence_threshold);
    params.max_boxes = file.max_boxes.unwrap_or(params.max_boxes);
    params.max_overlap = file.max_overlap.unwrap_or(params.max_overlap);

    Ok(self)
  }

  fn apply_query(mut self, key: &str, value: &str) -> Result<Self, ConfigError> {
    match key {
      "rows" => self.layout.row_count = parse_value(key, value)?,
      "columns" => self.layout.column_count = parse_value(key, value)?,
      "classes" => self.layout.class_count = parse_value(key, value)?,
      "boxes" => self.layout.boxes_per_cell = parse_value(key, value)?,
      "cell_width" => self.layout.cell_width = parse_value(key, value)?,
      "cell_height" => self.layout.cell_height = parse_value(key, value)?,
      "anchors" => {
        let flat: Vec<f32> = parse_list(key, value)?;
        self.anchors = Some(AnchorTable::from_flat(&flat)?);
      }
      "labels" => {
        self.labels = value.split(',').map(|s| s.trim().to_string()).collect();
      }
      "confidence" => self.params.confidence_threshold = parse_value(key, value)?,
      "max_boxes" => self.params.max_boxes = parse_value(key, value)?,
      "max_overlap" => self.params.max_overlap = parse_value(key, value)?,
      other => warn!("忽略未知的解码配置项: {}={}", other, value),
    }
    Ok(self)
  }

  pub fn build(self) -> Result<GridDecoder, ConfigError> {
    let anchors = self.anchors.unwrap_or_default();

    if let Err(e) = self.layout.validate() {
      error!("布局配置无效: {}", e);
      return Err(e);
    }
    if let Err(e) = anchors.validate(self.layout.boxes_per_cell) {
      error!("锚框配置无效: {}", e);
      return Err(e);
    }
    self.params.validate()?;

    debug!("解码布局: {:?}", self.layout);
    debug!("张量长度: {}", self.layout.tensor_len());
    debug!("锚框: {:?}", anchors);
    if !self.labels.is_empty() && self.labels.len() < self.layout.class_count {
      warn!(
        "类别名称 ({}) 少于类别数量 ({})，缺失部分以下标代替",
        self.labels.len(),
        self.layout.class_count
      );
    }

    Ok(GridDecoder {
      layout: self.layout,
      anchors,
      labels: self.labels,
      colors: self.colors,
      params: self.params,
    })
  }
}

/// 网格检测解码器
///
/// 布局和锚框在构造时校验，之后只读，可在线程间共享。
#[derive(Debug, Clone)]
pub struct GridDecoder {
  layout: LayoutConfig,
  anchors: AnchorTable,
  labels: LabelTable,
  colors: ColorTable,
  params: SuppressionParams,
}

impl GridDecoder {
  pub fn builder() -> GridDecoderBuilder {
    GridDecoderBuilder::default()
  }

  pub fn layout(&self) -> &LayoutConfig {
    &self.layout
  }

  pub fn anchors(&self) -> &AnchorTable {
    &self.anchors
  }

  pub fn colors(&self) -> &ColorTable {
    &self.colors
  }

  pub fn params(&self) -> &SuppressionParams {
    &self.params
  }

  /// 遍历所有 (行, 列, 锚框)，生成未经过滤的候选框
  pub fn candidates(&self, tensor: &RawTensor) -> Result<Vec<Detection>, DecodeError> {
    let layout = &self.layout;
    let data = tensor.as_ref();
    let expected = layout.tensor_len();
    if data.len() != expected {
      return Err(DecodeError::Shape {
        expected,
        actual: data.len(),
      });
    }

    let mut items = Vec::with_capacity(layout.cells_per_channel() * layout.boxes_per_cell);
    let mut class_logits = vec![0f32; layout.class_count];

    for row in 0..layout.row_count {
      for col in 0..layout.column_count {
        for (anchor_index, anchor) in self.anchors.iter().enumerate() {
          let at = |feature| data[layout.offset(row, col, anchor_index, feature)];
          let computation = |what: String| DecodeError::Computation {
            row,
            col,
            anchor: anchor_index,
            what,
          };

          let logits = BoxLogits {
            x: at(Feature::X),
            y: at(Feature::Y),
            width: at(Feature::Width),
            height: at(Feature::Height),
          };
          trace!(
            "原始框 ({}, {}, {}): {:?}",
            row, col, anchor_index, logits
          );

          let rect = map_box(&logits, row, col, anchor, layout).map_err(|g| {
            debug!(
              "候选框 ({}, {}, {}) 尺寸溢出，整张图像解码失败: {:?}",
              row, col, anchor_index, g
            );
            computation(format!("几何映射得到非有限值: {:?}", g))
          })?;

          for (c, slot) in class_logits.iter_mut().enumerate() {
            *slot = at(Feature::Class(c));
          }
          let score = ClassScorer::score(at(Feature::Confidence), &class_logits)
            .ok_or_else(|| computation("类别数量为 0".to_string()))?;
          if !score.confidence.is_finite() || score.distribution.iter().any(|p| !p.is_finite()) {
            return Err(computation(format!(
              "类别概率包含非有限值: 置信度 {}",
              score.confidence
            )));
          }

          trace!(
            "候选框 ({}, {}, {}): {:?}, 类别 {}, 置信度 {:.4}",
            row, col, anchor_index, rect, score.class_index, score.confidence
          );

          items.push(Detection {
            rect,
            label: self.labels.label_of(score.class_index),
            confidence: score.confidence,
            class_index: score.class_index,
            class_scores: score.distribution,
          });
        }
      }
    }

    Ok(items)
  }

  /// 解码单张图像：生成候选框后过滤并做非极大值抑制
  ///
  /// 任意一个候选框的几何或概率出现非有限值（例如宽高 logit 超过约 88 时 `exp` 溢出），
  /// 整张图像都返回 [`DecodeError::Computation`]，不会跳过该候选框继续解码。
  pub fn decode_image(&self, tensor: &RawTensor, params: &SuppressionParams) -> ImageResult {
    let candidates = self.candidates(tensor)?;
    let total = candidates.len();
    let kept = suppress(candidates, params);
    debug!("候选框 {} 个，保留 {} 个", total, kept.len());
    Ok(kept.into_boxed_slice())
  }

  /// 并行解码一批图像
  ///
  /// 参数无效时整批拒绝；单张图像的失败只记录在该图像的结果中。
  pub fn decode_batch(
    &self,
    frames: &[TensorFrame],
    params: &SuppressionParams,
  ) -> Result<DetectionSet, ParamsError> {
    params.validate()?;

    let results: Vec<(String, ImageResult)> = frames
      .par_iter()
      .map(|frame| {
        let result = self.decode_image(&frame.tensor, params);
        match &result {
          Ok(items) => debug!("图像 {}: 检测到 {} 个物体", frame.id, items.len()),
          Err(e) => warn!("图像 {} 解码失败: {}", frame.id, e),
        }
        (frame.id.clone(), result)
      })
      .collect();

    let mut set = DetectionSet::default();
    for (id, result) in results {
      if set.get(&id).is_some() {
        warn!("重复的图像标识 {}，保留最后一个结果", id);
      }
      set.insert(id, result);
    }
    Ok(set)
  }
}

impl Model for GridDecoder {
  type Input = [TensorFrame];
  type Output = DetectionSet;
  type Error = ParamsError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.decode_batch(input, &self.params)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn single_cell(classes: usize) -> LayoutConfig {
    LayoutConfig {
      row_count: 1,
      column_count: 1,
      class_count: classes,
      boxes_per_cell: 1,
      cell_width: 32,
      cell_height: 32,
    }
  }

  #[test]
  fn default_builder_is_valid() {
    let decoder = GridDecoder::builder().build().unwrap();
    assert_eq!(decoder.layout().tensor_len(), 21125);
    assert_eq!(decoder.anchors().len(), 5);
  }

  #[test]
  fn mismatched_anchor_count_is_rejected() {
    let result = GridDecoder::builder().layout(single_cell(2)).build();
    assert!(matches!(
      result,
      Err(ConfigError::AnchorCountMismatch {
        expected: 1,
        actual: 5
      })
    ));
  }

  #[test]
  fn candidates_are_not_filtered() {
    let layout = LayoutConfig {
      row_count: 2,
      column_count: 2,
      boxes_per_cell: 2,
      ..single_cell(3)
    };
    let decoder = GridDecoder::builder()
      .layout(layout)
      .anchors(AnchorTable::from(&[(1.0, 1.0), (2.0, 2.0)][..]))
      .build()
      .unwrap();
    let tensor = RawTensor::from(vec![-8.0; layout.tensor_len()]);
    let candidates = decoder.candidates(&tensor).unwrap();
    assert_eq!(candidates.len(), 8);
    assert!(candidates.iter().all(|d| d.confidence < 0.01));
  }

  #[test]
  fn nan_logit_is_computation_error() {
    let decoder = GridDecoder::builder()
      .layout(single_cell(2))
      .anchors(AnchorTable::from(&[(1.0, 1.0)][..]))
      .build()
      .unwrap();
    let tensor = RawTensor::from(vec![0.0, 0.0, 0.0, 0.0, f32::NAN, 0.0, 0.0]);
    assert!(matches!(
      decoder.candidates(&tensor),
      Err(DecodeError::Computation { .. })
    ));
  }

  #[test]
  fn overflowing_width_fails_whole_image() {
    let decoder = GridDecoder::builder()
      .layout(LayoutConfig {
        row_count: 2,
        ..single_cell(2)
      })
      .anchors(AnchorTable::from(&[(1.0, 1.0)][..]))
      .build()
      .unwrap();
    let mut data = vec![0.0; decoder.layout().tensor_len()];
    data[decoder.layout().offset(1, 0, 0, Feature::Width)] = 100.0;
    let result = decoder.decode_image(&RawTensor::from(data), &SuppressionParams::default());
    assert!(matches!(
      result,
      Err(DecodeError::Computation {
        row: 1,
        col: 0,
        anchor: 0,
        ..
      })
    ));
  }

  #[test]
  fn shape_is_checked_before_indexing() {
    let decoder = GridDecoder::builder()
      .layout(single_cell(2))
      .anchors(AnchorTable::from(&[(1.0, 1.0)][..]))
      .build()
      .unwrap();
    let tensor = RawTensor::from(vec![0.0; 6]);
    assert_eq!(
      decoder.candidates(&tensor),
      Err(DecodeError::Shape {
        expected: 7,
        actual: 6
      })
    );
  }

  #[test]
  fn url_query_configures_decoder() {
    let url = Url::parse(
      "grid:?rows=1&columns=1&classes=2&boxes=1&anchors=2.0,3.0&labels=cat,dog&max_boxes=3",
    )
    .unwrap();
    let decoder = GridDecoderBuilder::from_url(&url).unwrap().build().unwrap();
    assert_eq!(decoder.layout().tensor_len(), 7);
    assert_eq!(decoder.params().max_boxes, 3);
    assert_eq!(decoder.anchors().get(0).map(|a| a.height_ratio), Some(3.0));
    assert_eq!(decoder.labels.label_of(1), "dog");
  }

  #[test]
  fn oversized_layout_fails_to_build() {
    let url = Url::parse(&format!(
      "grid:?rows={}&columns=4&classes=1&boxes=1&anchors=1,1",
      usize::MAX / 2
    ))
    .unwrap();
    let builder = GridDecoderBuilder::from_url(&url).unwrap();
    assert!(matches!(
      builder.build(),
      Err(ConfigError::InvalidValue { ref key, .. }) if key == "layout"
    ));
  }

  #[test]
  fn url_rejects_bad_values() {
    let url = Url::parse("grid:?rows=abc").unwrap();
    assert!(matches!(
      GridDecoderBuilder::from_url(&url),
      Err(ConfigError::InvalidValue { .. })
    ));
    let url = Url::parse("grid:?anchors=1.0,2.0,3.0").unwrap();
    assert!(matches!(
      GridDecoderBuilder::from_url(&url),
      Err(ConfigError::OddAnchorList(3))
    ));
    let url = Url::parse("tensor:///tmp/x").unwrap();
    assert!(matches!(
      GridDecoderBuilder::from_url(&url),
      Err(ConfigError::SchemeMismatch { .. })
    ));
  }

  #[test]
  fn json_file_configures_decoder() {
    let dir = std::env::temp_dir().join(format!("shanan-grid-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("layout.json");
    std::fs::write(
      &path,
      r#"{
        "rows": 2, "columns": 3, "classes": 1, "boxes_per_cell": 2,
        "cell_width": 8, "cell_height": 16,
        "anchors": [[1.0, 1.0], [2.0, 0.5]],
        "labels": ["ball"],
        "colors": [[0, 0, 255]]
      }"#,
    )
    .unwrap();

    let url = Url::from_file_path(&path).unwrap();
    let url = Url::parse(&format!("grid://{}?max_overlap=0.25", url.path())).unwrap();
    let decoder = GridDecoderBuilder::from_url(&url).unwrap().build().unwrap();
    assert_eq!(decoder.layout().tensor_len(), 2 * 6 * 6);
    assert_eq!(decoder.params().max_overlap, 0.25);
    assert_eq!(decoder.colors().color_for(5), [0, 0, 255]);

    std::fs::write(&path, r#"{ "boxes_per_cell": 1, "anchors": [[1.0]] }"#).unwrap();
    assert!(matches!(
      GridDecoderBuilder::from_url(&url),
      Err(ConfigError::AnchorPairWidth { index: 0, len: 1 })
    ));

    std::fs::remove_dir_all(&dir).ok();
  }
}
