//! Group selectors: `all`, `7`, `1-10`, `1-10,15,40-42`.

use anyhow::{bail, Context, Result};
use treepack::score::MAX_GROUP;

/// Sorted, de-duplicated group sizes in `1..=MAX_GROUP`.
pub fn parse_groups(raw: &str) -> Result<Vec<usize>> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("all") {
        return Ok((1..=MAX_GROUP).collect());
    }
    let mut out = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (lo, hi) = match part.split_once('-') {
            Some((a, b)) => (parse_one(a)?, parse_one(b)?),
            None => {
                let n = parse_one(part)?;
                (n, n)
            }
        };
        if lo > hi {
            bail!("empty group range {part:?}");
        }
        out.extend(lo..=hi);
    }
    if out.is_empty() {
        bail!("no groups selected by {raw:?}");
    }
    out.sort_unstable();
    out.dedup();
    Ok(out)
}

fn parse_one(raw: &str) -> Result<usize> {
    let n: usize = raw
        .trim()
        .parse()
        .with_context(|| format!("bad group size {raw:?}"))?;
    if !(1..=MAX_GROUP).contains(&n) {
        bail!("group size {n} outside 1..={MAX_GROUP}");
    }
    Ok(n)
}
