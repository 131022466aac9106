//! Page selections accepted by `delete_pages`.

use crate::error::{Error, Result};
use std::collections::{BTreeSet, HashSet};
use std::ops::RangeInclusive;

const BAD_PAGE: &str = "Bad page number";
const BAD_PAGES: &str = "Bad page number(s)";

/// Which pages an operation applies to.
///
/// Every index may be negative and then counts from the end
/// (`-1` is the last page).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSelection {
    /// One page
    Single(i64),
    /// Inclusive range; a missing bound means the first or last page
    Range {
        /// First page (default 0)
        from_page: Option<i64>,
        /// Last page (default: last page of the document)
        to_page: Option<i64>,
    },
    /// Inclusive range given as two positions in either order
    Span(i64, i64),
    /// Explicit pages; duplicates are ignored
    List(Vec<i64>),
}

impl PageSelection {
    /// Inclusive range with optional bounds.
    pub fn range(from_page: Option<i64>, to_page: Option<i64>) -> Self {
        Self::Range { from_page, to_page }
    }

    fn shape(&self) -> &'static str {
        match self {
            Self::Single(_) => "single",
            Self::Range { .. } => "range",
            Self::Span(..) => "span",
            Self::List(_) => "list",
        }
    }

    /// Resolve to distinct, ascending zero-based page indices.
    ///
    /// Fails on the first index that lies outside the document after
    /// negative wraparound, without touching anything.
    pub fn resolve(&self, page_count: usize) -> Result<Vec<usize>> {
        let reason = match self {
            Self::Single(_) => BAD_PAGE,
            _ => BAD_PAGES,
        };
        let check = |given: i64| -> Result<usize> {
            let wrapped = if given < 0 { given + page_count as i64 } else { given };
            usize::try_from(wrapped)
                .ok()
                .filter(|&idx| idx < page_count)
                .ok_or(Error::InvalidPageSelection {
                    shape: self.shape(),
                    reason,
                    index: given,
                    page_count,
                })
        };

        let mut pages = match self {
            Self::Single(n) => vec![check(*n)?],
            Self::Range { from_page, to_page } => {
                let from = check(from_page.unwrap_or(0))?;
                let to = check(to_page.unwrap_or(-1))?;
                if from > to {
                    return Err(Error::InvalidPageSelection {
                        shape: self.shape(),
                        reason,
                        index: from_page.unwrap_or(0),
                        page_count,
                    });
                }
                (from..=to).collect()
            },
            Self::Span(a, b) => {
                let (a, b) = (check(*a)?, check(*b)?);
                (a.min(b)..=a.max(b)).collect()
            },
            Self::List(items) => items.iter().map(|&n| check(n)).collect::<Result<Vec<_>>>()?,
        };
        pages.sort_unstable();
        pages.dedup();
        Ok(pages)
    }
}

impl From<i64> for PageSelection {
    fn from(n: i64) -> Self {
        Self::Single(n)
    }
}

impl From<i32> for PageSelection {
    fn from(n: i32) -> Self {
        Self::Single(n as i64)
    }
}

impl From<usize> for PageSelection {
    fn from(n: usize) -> Self {
        Self::Single(n as i64)
    }
}

impl<T: Into<i64>> From<(T, T)> for PageSelection {
    fn from((a, b): (T, T)) -> Self {
        Self::Span(a.into(), b.into())
    }
}

impl<T: Into<i64>> From<RangeInclusive<T>> for PageSelection {
    fn from(range: RangeInclusive<T>) -> Self {
        let (from, to) = range.into_inner();
        Self::range(Some(from.into()), Some(to.into()))
    }
}

impl<T: Into<i64>> From<Vec<T>> for PageSelection {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<i64> + Copy> From<&[T]> for PageSelection {
    fn from(items: &[T]) -> Self {
        Self::List(items.iter().map(|&n| n.into()).collect())
    }
}

impl<T: Into<i64>, const N: usize> From<[T; N]> for PageSelection {
    fn from(items: [T; N]) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<i64>> From<HashSet<T>> for PageSelection {
    fn from(items: HashSet<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<i64>> From<BTreeSet<T>> for PageSelection {
    fn from(items: BTreeSet<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}
