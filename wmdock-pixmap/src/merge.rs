//! Palette merging
//!
//! Two fragments authored independently pick their color keys
//! independently. Merging the secondary fragment into the primary palette
//! keeps every primary binding intact and rewrites the secondary bitmap so
//! each pixel keeps its color under whatever key it ends up with:
//!
//! - same key, same color: nothing to do
//! - key free in primary: the binding is adopted as is
//! - key taken by another color: pixels move to the primary key already
//!   holding the color, or to a freshly allocated key
//!
//! Moving pixels onto a primary key the secondary itself still uses for a
//! different color first parks the secondary's own pixels on a fresh key.
//! Renamed keys are retired and the pass repeats until nothing changes.

use std::collections::BTreeMap;

use crate::error::{PixmapError, Result};
use crate::palette::{unused_key, Bitmap, Palette, KEY_ALPHABET};

/// Upper bound on passes; every pass with changes consumes alphabet keys
const MAX_PASSES: usize = KEY_ALPHABET.end as usize - KEY_ALPHABET.start as usize;

/// Merge `secondary` into `primary`, returning the superset palette and
/// `bitmap` rewritten to it
pub fn merge(primary: &Palette, secondary: &Palette, bitmap: &Bitmap) -> Result<(Palette, Bitmap)> {
    if let Some(key) = bitmap.keys().into_iter().find(|k| !secondary.contains_key(*k)) {
        return Err(PixmapError::MalformedInput(format!(
            "key {key:?} used in bitmap but missing from palette"
        )));
    }

    let mut merger = Merger {
        primary: primary.clone(),
        pending: secondary
            .iter()
            .map(|(k, c)| (k, Slot::Live(c.to_string())))
            .collect(),
        bitmap: bitmap.clone(),
    };
    merger.run()?;
    Ok((merger.primary, merger.bitmap))
}

/// Secondary palette entry while merging
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Live(String),
    /// Pixels were moved off this key; never bound again by this merge
    Retired,
}

struct Merger {
    primary: Palette,
    pending: BTreeMap<char, Slot>,
    bitmap: Bitmap,
}

impl Merger {
    fn run(&mut self) -> Result<()> {
        for pass in 1..=MAX_PASSES {
            if !self.pass()? {
                tracing::trace!("palette merge settled after {pass} passes");
                return Ok(());
            }
        }
        Err(PixmapError::PaletteExhausted)
    }

    /// One sweep over the live secondary keys; true when anything was renamed
    fn pass(&mut self) -> Result<bool> {
        let mut renamed = false;
        let keys: Vec<char> = self.pending.keys().copied().collect();

        for key in keys {
            let Some(color) = self.live(key) else {
                continue;
            };
            match self.primary.get(key) {
                Some(bound) if bound == color => {}
                None => {
                    self.primary.insert(key, color);
                }
                Some(_) => {
                    self.resolve_conflict(key, color)?;
                    renamed = true;
                }
            }
        }
        Ok(renamed)
    }

    /// `key` is bound to another color in primary
    fn resolve_conflict(&mut self, key: char, color: String) -> Result<()> {
        let Some(existing) = self.primary.key_for(&color) else {
            let fresh = self.fresh_key()?;
            self.pending.insert(fresh, Slot::Live(color));
            self.retarget(key, fresh);
            return Ok(());
        };

        match self.live(existing) {
            Some(theirs) if theirs != color => {
                let parked = self.fresh_key()?;
                tracing::debug!("parking {existing:?} ({theirs}) on {parked:?}");
                self.bitmap.replace_key(existing, parked);
                self.pending.insert(parked, Slot::Live(theirs));
                self.pending.insert(existing, Slot::Retired);
            }
            _ => {}
        }
        self.retarget(key, existing);
        Ok(())
    }

    fn retarget(&mut self, from: char, to: char) {
        tracing::debug!("renaming key {from:?} to {to:?}");
        self.bitmap.replace_key(from, to);
        self.pending.insert(from, Slot::Retired);
    }

    fn live(&self, key: char) -> Option<String> {
        match self.pending.get(&key)? {
            Slot::Live(color) => Some(color.clone()),
            Slot::Retired => None,
        }
    }

    /// Lowest key unused by either palette
    fn fresh_key(&self) -> Result<char> {
        unused_key(|k| self.primary.contains_key(k) || self.pending.contains_key(&k))
    }
}
