// 该文件是 Shanan （山南西风） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use shanan_grid::{
  FromUrl,
  input::InputWrapper,
  model::{GridDecoderBuilder, nms::SuppressionParams},
  output::OutputWrapper,
  task::{OneShotTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("解码配置: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let builder = GridDecoderBuilder::from_url(&args.model)?;
  let defaults = *builder.current_params();
  let params = SuppressionParams {
    confidence_threshold: args.confidence.unwrap_or(defaults.confidence_threshold),
    max_boxes: args.max_boxes.unwrap_or(defaults.max_boxes),
    max_overlap: args.max_overlap.unwrap_or(defaults.max_overlap),
  };
  info!(
    "置信度阈值: {}, 最大检测数: {}, NMS 阈值: {}",
    params.confidence_threshold, params.max_boxes, params.max_overlap
  );

  let decoder = builder.params(params).build()?;
  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?.with_colors(decoder.colors());

  OneShotTask.run_task(input, decoder, output)?;

  Ok(())
}
