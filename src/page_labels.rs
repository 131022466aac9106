//! Page labels.
//!
//! Page labels give sections of a document their own numbering: a preface
//! numbered i, ii, iii followed by a body numbered 1, 2, 3, or appendix pages
//! labelled A-1, A-2. A label rule applies from its start page until the next
//! rule; pages before the first rule get plain decimal numbers.
//!
//! Rules are stored in the catalog's `/PageLabels` number tree as
//! `(start_page, dict)` pairs where the dictionary carries `/S` (style),
//! `/P` (prefix) and `/St` (first number, omitted when 1).

use crate::document::Document;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Page numbering style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PageLabelStyle {
    /// No number; the label is just the prefix
    #[default]
    #[serde(rename = "")]
    None,
    /// Decimal Arabic numerals (1, 2, 3, ...)
    #[serde(rename = "D")]
    Decimal,
    /// Uppercase Roman numerals (I, II, III, IV, ...)
    #[serde(rename = "R")]
    RomanUpper,
    /// Lowercase Roman numerals (i, ii, iii, iv, ...)
    #[serde(rename = "r")]
    RomanLower,
    /// Uppercase letters (A, B, ... Z, AA, AB, ...)
    #[serde(rename = "A")]
    AlphaUpper,
    /// Lowercase letters (a, b, ... z, aa, ab, ...)
    #[serde(rename = "a")]
    AlphaLower,
}

impl PageLabelStyle {
    /// Style for a `/S` name; unknown names mean no style.
    pub fn from_name(name: &str) -> Self {
        match name {
            "D" => PageLabelStyle::Decimal,
            "R" => PageLabelStyle::RomanUpper,
            "r" => PageLabelStyle::RomanLower,
            "A" => PageLabelStyle::AlphaUpper,
            "a" => PageLabelStyle::AlphaLower,
            _ => PageLabelStyle::None,
        }
    }

    /// `/S` name of the style, `None` for [`PageLabelStyle::None`].
    pub fn to_name(self) -> Option<&'static str> {
        match self {
            PageLabelStyle::Decimal => Some("D"),
            PageLabelStyle::RomanUpper => Some("R"),
            PageLabelStyle::RomanLower => Some("r"),
            PageLabelStyle::AlphaUpper => Some("A"),
            PageLabelStyle::AlphaLower => Some("a"),
            PageLabelStyle::None => None,
        }
    }

    /// Short tag: the `/S` name, or `""` for no style.
    pub fn tag(self) -> &'static str {
        self.to_name().unwrap_or("")
    }

    /// Render `n` in this style.
    pub fn render(self, n: u32) -> String {
        match self {
            PageLabelStyle::Decimal => n.to_string(),
            PageLabelStyle::RomanUpper => to_roman(n, true),
            PageLabelStyle::RomanLower => to_roman(n, false),
            PageLabelStyle::AlphaUpper => to_alpha(n, true),
            PageLabelStyle::AlphaLower => to_alpha(n, false),
            PageLabelStyle::None => String::new(),
        }
    }
}

/// One numbering rule, active from `start_page` until the next rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLabelRule {
    /// First page (0-based) the rule applies to
    pub start_page: u32,
    /// Text placed before the number
    #[serde(default)]
    pub prefix: String,
    /// Numbering style
    #[serde(default)]
    pub style: PageLabelStyle,
    /// Number of the rule's first page (at least 1)
    #[serde(default = "default_first_page_num")]
    pub first_page_num: u32,
}

fn default_first_page_num() -> u32 {
    1
}

impl PageLabelRule {
    /// Decimal rule starting at `start_page`, numbered from 1, no prefix.
    pub fn new(start_page: u32) -> Self {
        Self {
            start_page,
            prefix: String::new(),
            style: PageLabelStyle::Decimal,
            first_page_num: 1,
        }
    }

    /// Set the numbering style.
    pub fn with_style(mut self, style: PageLabelStyle) -> Self {
        self.style = style;
        self
    }

    /// Set the prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the first number; values below 1 become 1.
    pub fn with_first_page_num(mut self, first_page_num: u32) -> Self {
        self.first_page_num = first_page_num.max(1);
        self
    }

    /// Label of `page_index` under this rule.
    pub fn format(&self, page_index: usize) -> String {
        let offset = page_index.saturating_sub(self.start_page as usize);
        let n = u32::try_from(offset)
            .unwrap_or(u32::MAX)
            .saturating_add(self.first_page_num.max(1));
        format!("{}{}", self.prefix, self.style.render(n))
    }

    fn to_object(&self) -> Object {
        let mut dict = Dictionary::new();
        if let Some(name) = self.style.to_name() {
            dict.insert("S".to_string(), Object::name(name));
        }
        if !self.prefix.is_empty() {
            dict.insert("P".to_string(), Object::text(self.prefix.as_str()));
        }
        if self.first_page_num > 1 {
            dict.insert("St".to_string(), Object::Integer(self.first_page_num as i64));
        }
        Object::Dictionary(dict)
    }
}

/// Label of page `page_index` under `rules`.
///
/// The active rule is the one with the greatest `start_page` not after the
/// page; without one the label is the 1-based page number.
pub fn format_label(page_index: usize, rules: &[PageLabelRule]) -> String {
    rules
        .iter()
        .filter(|r| r.start_page as usize <= page_index)
        .max_by_key(|r| r.start_page)
        .map(|r| r.format(page_index))
        .unwrap_or_else(|| (page_index + 1).to_string())
}

/// Pages among the first `page_count` whose label is `label`.
///
/// Labels need not be unique, so every page is checked; with `only_one` the
/// scan stops at the first match.
pub fn resolve_label(
    label: &str,
    rules: &[PageLabelRule],
    page_count: usize,
    only_one: bool,
) -> Vec<usize> {
    let matches = (0..page_count).filter(|&i| format_label(i, rules) == label);
    if only_one {
        matches.take(1).collect()
    } else {
        matches.collect()
    }
}

/// Convert a number to Roman numerals.
pub fn to_roman(mut n: u32, uppercase: bool) -> String {
    if n == 0 {
        return String::new();
    }

    let numerals = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];

    let mut result = String::new();
    for (value, numeral) in numerals.iter() {
        while n >= *value {
            result.push_str(numeral);
            n -= value;
        }
    }

    if uppercase {
        result.to_uppercase()
    } else {
        result
    }
}

/// Convert a number to bijective base-26 letters.
/// 1=A, 2=B, ..., 26=Z, 27=AA, 28=AB, ...
pub fn to_alpha(mut n: u32, uppercase: bool) -> String {
    let base = if uppercase { b'A' } else { b'a' };
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push((base + (n % 26) as u8) as char);
        n /= 26;
    }
    letters.iter().rev().collect()
}

/// Decode a text string that may be UTF-16BE with a byte order mark.
fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

impl Document {
    /// Page label rules stored in the catalog, sorted by start page.
    pub fn page_labels(&self) -> Vec<PageLabelRule> {
        let tree = match self.catalog().as_dict().and_then(|d| d.get("PageLabels")) {
            Some(tree) => tree,
            None => return Vec::new(),
        };
        let mut rules = Vec::new();
        let mut visited = HashSet::new();
        self.collect_label_rules(tree, &mut rules, &mut visited);
        rules.sort_by_key(|r| r.start_page);
        rules
    }

    /// Walk a number tree, reading `/Nums` pairs and descending into `/Kids`.
    fn collect_label_rules(
        &self,
        node: &Object,
        rules: &mut Vec<PageLabelRule>,
        visited: &mut HashSet<u32>,
    ) {
        if let Some(r) = node.as_reference() {
            if !visited.insert(r.id) {
                log::warn!("cycle in /PageLabels number tree at {}", r);
                return;
            }
        }
        let dict = match self.resolve(node).as_dict() {
            Some(dict) => dict,
            None => return,
        };

        if let Some(nums) = dict.get("Nums").and_then(|n| self.resolve(n).as_array()) {
            for pair in nums.chunks_exact(2) {
                let start_page = match pair[0].as_integer().and_then(|n| u32::try_from(n).ok()) {
                    Some(start) => start,
                    None => {
                        log::debug!("skipping page label key {:?}", pair[0]);
                        continue;
                    },
                };
                if let Some(label) = self.resolve(&pair[1]).as_dict() {
                    rules.push(self.parse_label_rule(start_page, label));
                }
            }
        }

        if let Some(kids) = dict.get("Kids").and_then(|k| self.resolve(k).as_array()) {
            for kid in kids {
                self.collect_label_rules(kid, rules, visited);
            }
        }
    }

    fn parse_label_rule(&self, start_page: u32, dict: &Dictionary) -> PageLabelRule {
        let style = dict
            .get("S")
            .and_then(Object::as_name)
            .map(PageLabelStyle::from_name)
            .unwrap_or(PageLabelStyle::None);
        let prefix = dict
            .get("P")
            .and_then(|p| self.resolve(p).as_bytes())
            .map(decode_text_string)
            .unwrap_or_default();
        let first_page_num = dict
            .get("St")
            .and_then(Object::as_integer)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(1)
            .max(1);
        PageLabelRule {
            start_page,
            prefix,
            style,
            first_page_num,
        }
    }

    /// Replace all page label rules. An empty list removes `/PageLabels`.
    pub fn set_page_labels(&mut self, rules: &[PageLabelRule]) -> Result<()> {
        let catalog = self
            .catalog_ref()
            .ok_or_else(|| Error::InvalidPdf("trailer has no /Root".to_string()))?;
        if rules.is_empty() {
            return self.delete(catalog, "PageLabels");
        }

        let mut sorted: Vec<&PageLabelRule> = rules.iter().collect();
        sorted.sort_by_key(|r| r.start_page);
        let mut nums = Vec::with_capacity(sorted.len() * 2);
        for rule in sorted {
            nums.push(Object::Integer(rule.start_page as i64));
            nums.push(rule.to_object());
        }
        self.put(
            catalog,
            "PageLabels",
            Object::dict([("Nums", Object::Array(nums))]),
        )
    }

    /// Set the rule starting at page `index`, replacing any rule already
    /// starting there.
    pub fn set_page_label(
        &mut self,
        index: usize,
        style: PageLabelStyle,
        prefix: &str,
        first_page_num: u32,
    ) -> Result<()> {
        let start_page = self.label_index(index)?;
        let mut rules = self.page_labels();
        rules.retain(|r| r.start_page != start_page);
        rules.push(
            PageLabelRule::new(start_page)
                .with_style(style)
                .with_prefix(prefix)
                .with_first_page_num(first_page_num),
        );
        self.set_page_labels(&rules)
    }

    /// Remove the rule starting at page `index`, if there is one.
    pub fn delete_page_label(&mut self, index: usize) -> Result<()> {
        let start_page = self.label_index(index)?;
        let mut rules = self.page_labels();
        let before = rules.len();
        rules.retain(|r| r.start_page != start_page);
        if rules.len() == before {
            return Ok(());
        }
        self.set_page_labels(&rules)
    }

    /// Label of the page at `index`.
    pub fn page_label(&self, index: usize) -> Result<String> {
        self.label_index(index)?;
        Ok(format_label(index, &self.page_labels()))
    }

    /// Pages labelled `label`; with `only_one`, at most the first.
    pub fn page_numbers(&self, label: &str, only_one: bool) -> Vec<usize> {
        resolve_label(label, &self.page_labels(), self.page_count(), only_one)
    }

    fn label_index(&self, index: usize) -> Result<u32> {
        let page_count = self.page_count();
        if index >= page_count {
            return Err(Error::PageIndexOutOfRange {
                index: index as i64,
                page_count,
            });
        }
        u32::try_from(index).map_err(|_| Error::PageIndexOutOfRange {
            index: index as i64,
            page_count,
        })
    }
}
