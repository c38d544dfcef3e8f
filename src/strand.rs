//! Strand map: logical outputs → physical LEDs → screen-edge points.
//!
//! Up to four straight strands border the screen. Logical outputs are
//! numbered through the strands in fixed order (top, bottom, left, right),
//! including positions that have no LED behind them. Each non-skipped
//! position carries the index of the physical LED on the wire.

use std::fmt;
use std::str::FromStr;

/// One edge of the screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strand {
    Top,
    Bottom,
    Left,
    Right,
}

impl Strand {
    /// All strands, in logical output order.
    pub const ALL: [Strand; 4] = [Strand::Top, Strand::Bottom, Strand::Left, Strand::Right];

    pub fn index(self) -> usize {
        match self {
            Strand::Top => 0,
            Strand::Bottom => 1,
            Strand::Left => 2,
            Strand::Right => 3,
        }
    }

    /// Top and bottom strands run along the screen width.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Strand::Top | Strand::Bottom)
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strand::Top => "top",
            Strand::Bottom => "bottom",
            Strand::Left => "left",
            Strand::Right => "right",
        };
        f.write_str(name)
    }
}

// ── Strand specification strings ─────────────────────────────────────

/// Errors from parsing a strand specification like `"33-0,X4,5"`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrandSpecError {
    #[error("empty LED list")]
    Empty,
    #[error("empty entry at position {0}")]
    EmptyToken(usize),
    #[error("invalid LED index '{0}'")]
    InvalidIndex(String),
    #[error("invalid LED range '{0}'")]
    InvalidRange(String),
    #[error("invalid skip count '{0}'")]
    InvalidSkip(String),
    #[error("'{0}' makes the strand longer than {max} positions", max = MAX_STRAND_LEN)]
    TooLong(String),
}

/// Most positions a single strand may have.
pub const MAX_STRAND_LEN: usize = u16::MAX as usize;

/// The ordered positions of one strand; `None` marks a skipped position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StrandSpec {
    positions: Vec<Option<usize>>,
}

impl StrandSpec {
    pub fn new(positions: Vec<Option<usize>>) -> Self {
        Self { positions }
    }

    pub fn positions(&self) -> &[Option<usize>] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of positions backed by a physical LED.
    pub fn led_count(&self) -> usize {
        self.positions.iter().filter(|p| p.is_some()).count()
    }
}

impl FromStr for StrandSpec {
    type Err = StrandSpecError;

    /// Comma separated tokens:
    /// - `N`: physical LED `N`
    /// - `-N`: one skipped position
    /// - `A-B`: LEDs `A` through `B`, counting up or down
    /// - `X` or `XN`: one or `N` skipped positions
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(StrandSpecError::Empty);
        }

        let mut positions = Vec::new();
        for (i, token) in s.split(',').map(str::trim).enumerate() {
            if token.is_empty() {
                return Err(StrandSpecError::EmptyToken(i));
            }

            let too_long = |added: usize| positions.len().saturating_add(added) > MAX_STRAND_LEN;

            if let Some(count) = token.strip_prefix(['X', 'x']) {
                let count = if count.is_empty() {
                    1
                } else {
                    count
                        .parse::<usize>()
                        .map_err(|_| StrandSpecError::InvalidSkip(token.to_string()))?
                };
                if too_long(count) {
                    return Err(StrandSpecError::TooLong(token.to_string()));
                }
                positions.extend(std::iter::repeat_n(None, count));
            } else if let Some(negative) = token.strip_prefix('-') {
                negative
                    .parse::<usize>()
                    .map_err(|_| StrandSpecError::InvalidIndex(token.to_string()))?;
                if too_long(1) {
                    return Err(StrandSpecError::TooLong(token.to_string()));
                }
                positions.push(None);
            } else if let Some((start, end)) = token.split_once('-') {
                let invalid = || StrandSpecError::InvalidRange(token.to_string());
                let start = start.trim().parse::<usize>().map_err(|_| invalid())?;
                let end = end.trim().parse::<usize>().map_err(|_| invalid())?;
                if too_long(start.abs_diff(end).saturating_add(1)) {
                    return Err(StrandSpecError::TooLong(token.to_string()));
                }
                if start <= end {
                    positions.extend((start..=end).map(Some));
                } else {
                    positions.extend((end..=start).rev().map(Some));
                }
            } else {
                let led = token
                    .parse::<usize>()
                    .map_err(|_| StrandSpecError::InvalidIndex(token.to_string()))?;
                if too_long(1) {
                    return Err(StrandSpecError::TooLong(token.to_string()));
                }
                positions.push(Some(led));
            }
        }

        Ok(Self { positions })
    }
}

// ── Strand map ───────────────────────────────────────────────────────

/// Rejected combinations of strands.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("LED {led} is assigned to more than one position")]
    DuplicateLed { led: usize },
    #[error("LED {led} is out of range for {count} LEDs (indices must be 0..{count} without gaps)")]
    LedOutOfRange { led: usize, count: usize },
}

/// Where a logical output lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub strand: Strand,
    /// Position within the strand, counting skipped positions.
    pub position: usize,
    /// Physical LED index on the wire.
    pub led: usize,
}

/// A point on the screen border.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// Sentinel for outputs without a physical LED.
    pub const INVALID: Point = Point { x: -1, y: -1 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// The four strands plus their insets, fixed after configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StrandMap {
    strands: [StrandSpec; 4],
    /// Inset of the first/last LED as a fraction of the strand's screen dimension.
    insets: [f64; 4],
    led_count: usize,
}

impl StrandMap {
    /// Build a map, checking that the physical indices are exactly
    /// `0..led_count` with every index used once.
    pub fn new(strands: [StrandSpec; 4], insets: [f64; 4]) -> Result<Self, LayoutError> {
        let led_count: usize = strands.iter().map(StrandSpec::led_count).sum();

        let mut seen = vec![false; led_count];
        for led in strands.iter().flat_map(|s| s.positions.iter().flatten()) {
            let slot = seen.get_mut(*led).ok_or(LayoutError::LedOutOfRange {
                led: *led,
                count: led_count,
            })?;
            if *slot {
                return Err(LayoutError::DuplicateLed { led: *led });
            }
            *slot = true;
        }

        Ok(Self {
            strands,
            insets,
            led_count,
        })
    }

    /// Total logical outputs, skipped positions included.
    pub fn num_outputs(&self) -> usize {
        self.strands.iter().map(StrandSpec::len).sum()
    }

    /// Number of physical LEDs on the wire.
    pub fn led_count(&self) -> usize {
        self.led_count
    }

    pub fn strand(&self, strand: Strand) -> &StrandSpec {
        &self.strands[strand.index()]
    }

    pub fn inset(&self, strand: Strand) -> f64 {
        self.insets[strand.index()]
    }

    /// Find the strand, position and physical LED behind `output`.
    ///
    /// Returns `None` past the last output and for skipped positions.
    pub fn resolve(&self, output: usize) -> Option<Resolved> {
        let mut remaining = output;
        for strand in Strand::ALL {
            let spec = self.strand(strand);
            if remaining < spec.len() {
                return spec.positions[remaining].map(|led| Resolved {
                    strand,
                    position: remaining,
                    led,
                });
            }
            remaining -= spec.len();
        }
        None
    }

    /// Project `output` onto the border of a `width` × `height` screen.
    ///
    /// LEDs are spread evenly between the strand's insets; horizontal
    /// strands pin y to 0 (top) or `height` (bottom), vertical strands pin
    /// x to 0 (left) or `width` (right).
    pub fn project_to_screen(&self, output: usize, width: i32, height: i32) -> Option<Point> {
        let resolved = self.resolve(output)?;
        let strand = resolved.strand;

        let dim = f64::from(if strand.is_horizontal() { width } else { height });
        let inset = self.inset(strand) * dim;
        let usable = dim - 2.0 * inset;
        let steps = self.strand(strand).len().saturating_sub(1);

        let offset = if steps == 0 {
            inset
        } else {
            inset + (usable / steps as f64) * resolved.position as f64
        };
        let offset = offset.clamp(0.0, dim.max(0.0)) as i32;

        let point = match strand {
            Strand::Top => Point::new(offset, 0),
            Strand::Bottom => Point::new(offset, height),
            Strand::Left => Point::new(0, offset),
            Strand::Right => Point::new(width, offset),
        };
        Some(point)
    }
}
