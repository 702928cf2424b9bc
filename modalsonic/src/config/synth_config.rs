/// Which modes the synthesizer evaluates.
///
/// Modes outside the selection hold zero amplitude. This trades tonal detail
/// for per-sample cost and is independent of the damping classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeSelection {
    /// Evaluate every mode
    #[default]
    All,
    /// Evaluate the `n` modes with the highest indices
    TopN,
    /// Evaluate the `n` modes with the lowest indices
    BottomN,
}

/// Per-body synthesizer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SynthesizerConfig {
    pub mode_selection: ModeSelection,
    /// Mode count used by `TopN` / `BottomN`; ignored by `All`
    pub n: usize,
}

impl SynthesizerConfig {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn top_n(n: usize) -> Self {
        Self {
            mode_selection: ModeSelection::TopN,
            n,
        }
    }

    pub fn bottom_n(n: usize) -> Self {
        Self {
            mode_selection: ModeSelection::BottomN,
            n,
        }
    }

    /// Whether mode `index` out of `mode_count` is evaluated.
    pub fn is_selected(&self, index: usize, mode_count: usize) -> bool {
        match self.mode_selection {
            ModeSelection::All => true,
            ModeSelection::BottomN => index < self.n,
            ModeSelection::TopN => index + self.n >= mode_count,
        }
    }
}

/// Options applied when a modal basis is loaded for a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModalBasisOptions {
    /// Drop modes whose Rayleigh damping ratio is not underdamped at load time.
    ///
    /// Off by default: every mode is kept and the synthesizer's own
    /// underdamped check decides at run time whether a mode rings.
    pub discard_overdamped: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_selection() {
        let all = SynthesizerConfig::all();
        assert!((0..5).all(|i| all.is_selected(i, 5)));

        let bottom = SynthesizerConfig::bottom_n(2);
        let picked: Vec<usize> = (0..5).filter(|&i| bottom.is_selected(i, 5)).collect();
        assert_eq!(picked, vec![0, 1]);

        let top = SynthesizerConfig::top_n(2);
        let picked: Vec<usize> = (0..5).filter(|&i| top.is_selected(i, 5)).collect();
        assert_eq!(picked, vec![3, 4]);

        let top_all = SynthesizerConfig::top_n(10);
        assert!((0..5).all(|i| top_all.is_selected(i, 5)));
    }
}
