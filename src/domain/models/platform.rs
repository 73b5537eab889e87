// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 内容平台
///
/// 创作者所在的社交媒体平台。不同平台决定了抓取后端的优先级、
/// 搜索发现时使用的限定词以及相关性过滤所用的域名。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// 微博
    Weibo,
    /// 抖音
    Douyin,
    /// 小红书
    Xiaohongshu,
    /// 哔哩哔哩
    Bilibili,
    /// X (Twitter)
    X,
    /// 快手
    Kuaishou,
    /// 知乎
    Zhihu,
    /// 普通网站
    General,
}

/// 平台解析错误
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown platform: {0}")]
pub struct UnknownPlatform(pub String);

impl Platform {
    /// 所有已知平台
    pub const ALL: [Platform; 8] = [
        Platform::Weibo,
        Platform::Douyin,
        Platform::Xiaohongshu,
        Platform::Bilibili,
        Platform::X,
        Platform::Kuaishou,
        Platform::Zhihu,
        Platform::General,
    ];

    /// 平台标识字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Weibo => "weibo",
            Platform::Douyin => "douyin",
            Platform::Xiaohongshu => "xiaohongshu",
            Platform::Bilibili => "bilibili",
            Platform::X => "x",
            Platform::Kuaishou => "kuaishou",
            Platform::Zhihu => "zhihu",
            Platform::General => "general",
        }
    }

    /// 页面是否依赖 JavaScript 渲染
    ///
    /// 社交平台默认都需要浏览器渲染，优先走重量级浏览器后端
    pub fn is_js_heavy(&self) -> bool {
        !matches!(self, Platform::General)
    }

    /// 是否存在可靠的直接抓取路径
    ///
    /// 没有可靠直接路径的平台在所有后端失败后会降级到搜索引擎发现
    pub fn has_reliable_direct_path(&self) -> bool {
        matches!(self, Platform::General)
    }

    /// 平台的规范域名列表
    pub fn domains(&self) -> &'static [&'static str] {
        match self {
            Platform::Weibo => &["weibo.com", "weibo.cn", "m.weibo.cn"],
            Platform::Douyin => &["douyin.com", "iesdouyin.com"],
            Platform::Xiaohongshu => &["xiaohongshu.com", "xhslink.com"],
            Platform::Bilibili => &["bilibili.com", "b23.tv"],
            Platform::X => &["x.com", "twitter.com"],
            Platform::Kuaishou => &["kuaishou.com", "gifshow.com"],
            Platform::Zhihu => &["zhihu.com", "zhuanlan.zhihu.com"],
            Platform::General => &[],
        }
    }

    /// 平台关键词，用于搜索结果的相关性判断
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Platform::Weibo => &["微博", "weibo"],
            Platform::Douyin => &["抖音", "douyin"],
            Platform::Xiaohongshu => &["小红书", "xiaohongshu", "rednote"],
            Platform::Bilibili => &["哔哩哔哩", "bilibili", "b站"],
            Platform::X => &["twitter", "tweet", "推特"],
            Platform::Kuaishou => &["快手", "kuaishou"],
            Platform::Zhihu => &["知乎", "zhihu"],
            Platform::General => &[],
        }
    }

    /// 搜索发现时附加的限定词
    pub fn search_qualifier(&self) -> Option<String> {
        self.domains().first().map(|domain| format!("site:{}", domain))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weibo" => Ok(Platform::Weibo),
            "douyin" => Ok(Platform::Douyin),
            "xiaohongshu" | "xhs" => Ok(Platform::Xiaohongshu),
            "bilibili" => Ok(Platform::Bilibili),
            "x" | "twitter" => Ok(Platform::X),
            "kuaishou" => Ok(Platform::Kuaishou),
            "zhihu" => Ok(Platform::Zhihu),
            "general" | "web" => Ok(Platform::General),
            other => Err(UnknownPlatform(other.to_string())),
        }
    }
}
