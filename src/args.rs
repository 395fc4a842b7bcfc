// 该文件是 Shanan （山南西风） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;
use url::Url;

/// Shanan 网格检测解码参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 解码配置
  /// 例如: grid:///path/layout.json?classes=20&boxes=5
  #[arg(long, value_name = "MODEL", default_value = "grid:")]
  pub model: Url,

  /// 输入来源
  /// 支持格式:
  /// - 单个张量: tensor:///path/frame.bin
  /// - 目录: folder:///path/dir
  /// - JSON: json:///path/batch.json
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出路径
  /// 支持格式:
  /// - JSON: json:///path/out.json 或 json:- (标准输出)
  /// - 记录目录: folder:///path/dir?record=id
  /// - 日志: log:
  #[arg(long, value_name = "OUTPUT", default_value = "log:")]
  pub output: Url,

  /// 置信度阈值 (0.0 - 1.0)，覆盖解码配置
  #[arg(long, value_name = "THRESHOLD")]
  pub confidence: Option<f32>,

  /// 每张图像最多保留的检测数，覆盖解码配置
  #[arg(long, value_name = "COUNT")]
  pub max_boxes: Option<usize>,

  /// NMS IoU 阈值 (0.0 - 1.0)，覆盖解码配置
  #[arg(long, value_name = "THRESHOLD")]
  pub max_overlap: Option<f32>,
}
