//! 平面开启方式（Plan Swing）描述符解析。
//!
//! 描述符来自门嵌套族类型的名称，例如 `"Hinged 90"`、`"Pivot 45"`、`"Sliding"`。
//! 解析永不失败，无法识别的输入退化为 `(Unknown, 0)`。

use std::fmt;

use serde::{Deserialize, Serialize};

/// 对放置有意义的开启角度集合，其余角度一律记为 0。
pub const MEANINGFUL_SWING_ANGLES: [i32; 4] = [0, 45, 135, 180];

/// 门的开启方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SwingKind {
    None,
    Hinged,
    Pivot,
    Bifold,
    Sliding,
    #[default]
    Unknown,
}

impl SwingKind {
    /// 按区分大小写的方式匹配首个词元。
    pub fn from_token(token: &str) -> Self {
        match token {
            "None" => SwingKind::None,
            "Hinged" => SwingKind::Hinged,
            "Pivot" => SwingKind::Pivot,
            "Bifold" => SwingKind::Bifold,
            "Sliding" => SwingKind::Sliding,
            _ => SwingKind::Unknown,
        }
    }

    /// 平开与地弹门走铰点放置路径，并携带开启角度。
    #[inline]
    pub fn is_hinge_like(self) -> bool {
        matches!(self, SwingKind::Hinged | SwingKind::Pivot)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SwingKind::None => "None",
            SwingKind::Hinged => "Hinged",
            SwingKind::Pivot => "Pivot",
            SwingKind::Bifold => "Bifold",
            SwingKind::Sliding => "Sliding",
            SwingKind::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for SwingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 解析后的开启方式与角度。仅当 `kind` 为 Hinged/Pivot 时角度非零。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SwingDescriptor {
    pub kind: SwingKind,
    pub angle: i32,
}

impl SwingDescriptor {
    /// 构造描述符并收敛不变量：非铰点类型或不在有效集合内的角度记为 0。
    pub fn new(kind: SwingKind, angle: i32) -> Self {
        let angle = if kind.is_hinge_like() && MEANINGFUL_SWING_ANGLES.contains(&angle) {
            angle
        } else {
            0
        };
        Self { kind, angle }
    }

    #[inline]
    pub fn unknown() -> Self {
        Self::new(SwingKind::Unknown, 0)
    }

    /// 解析可能缺失的描述符文本。
    pub fn parse(descriptor: Option<&str>) -> Self {
        let Some(text) = descriptor else {
            return Self::unknown();
        };
        let mut tokens = text.split_whitespace();
        let Some(first) = tokens.next() else {
            return Self::unknown();
        };

        let kind = SwingKind::from_token(first);
        let angle = if kind.is_hinge_like() {
            tokens
                .next()
                .and_then(|token| token.parse::<i32>().ok())
                .unwrap_or(0)
        } else {
            0
        };
        Self::new(kind, angle)
    }
}

impl From<&str> for SwingDescriptor {
    fn from(value: &str) -> Self {
        Self::parse(Some(value))
    }
}

impl fmt::Display for SwingDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_hinge_like() {
            write!(f, "{} {}", self.kind, self.angle)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}
