use serde::Serialize;

use crate::database::models::Category;

/// Built-in expense categories, always listed first.
pub const FIXED_CATEGORIES: [&str; 8] = [
    "วัสดุอุปกรณ์",
    "ค่าแรงงาน",
    "ค่าเดินทาง",
    "ค่าอาหาร",
    "ค่าเช่าอุปกรณ์",
    "ค่าบริการ",
    "ค่าธรรมเนียม",
    "อื่นๆ",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub id: usize,
    pub name: String,
    pub value: String,
}

impl CatalogEntry {
    pub fn new(id: usize, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            value: name.to_string(),
        }
    }
}

/// Fixed categories numbered from 1, followed by custom ones in creation order.
pub fn catalog(custom: &[Category]) -> Vec<CatalogEntry> {
    FIXED_CATEGORIES
        .iter()
        .copied()
        .chain(custom.iter().map(|c| c.name.as_str()))
        .enumerate()
        .map(|(i, name)| CatalogEntry::new(i + 1, name))
        .collect()
}

pub fn exists(name: &str, custom: &[Category]) -> bool {
    FIXED_CATEGORIES.contains(&name) || custom.iter().any(|c| c.name == name)
}
