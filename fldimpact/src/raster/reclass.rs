//! Reclassification par seuils

/// Règle à deux seuils appliquée cellule par cellule.
///
/// `v >= arg1` devient `val1`, puis, sur le résultat, `v < arg2` devient `val2`.
/// La deuxième règle peut donc écraser la première.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReclassRule {
    pub arg1: f64,
    pub val1: f64,
    pub arg2: f64,
    pub val2: f64,
}

impl ReclassRule {
    pub fn new(arg1: f64, val1: f64, arg2: f64, val2: f64) -> Self {
        Self {
            arg1,
            val1,
            arg2,
            val2,
        }
    }

    /// Règle avec la deuxième paire par défaut (`< 0 → 0`)
    pub fn threshold(arg1: f64, val1: f64) -> Self {
        Self::new(arg1, val1, 0.0, 0.0)
    }

    /// Terres cultivées : ne garder que la classe 2, le reste à 0
    pub fn cropland() -> Self {
        Self::new(2.0, 2.0, 2.0, 0.0)
    }

    /// Raster d'inondation binaire : toute valeur >= 1 devient 1, le reste 0
    pub fn flood_mask() -> Self {
        Self::new(1.0, 1.0, 1.0, 0.0)
    }

    pub fn apply(&self, value: f64) -> f64 {
        if value.is_nan() {
            return value;
        }
        let v1 = if value >= self.arg1 { self.val1 } else { value };
        if v1 < self.arg2 {
            self.val2
        } else {
            v1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_rule_runs_on_first_result() {
        let rule = ReclassRule::new(2.0, 2.0, 2.0, 0.0);
        assert_eq!(rule.apply(1.0), 0.0);
        assert_eq!(rule.apply(5.0), 2.0);
        assert_eq!(rule.apply(2.0), 2.0);
    }

    #[test]
    fn test_second_rule_overwrites_first() {
        // val1 < arg2 : la première règle est annulée par la seconde
        let rule = ReclassRule::new(3.0, 1.0, 2.0, -9.0);
        assert_eq!(rule.apply(4.0), -9.0);
        assert_eq!(rule.apply(2.5), 2.5);
    }

    #[test]
    fn test_default_second_pair() {
        let rule = ReclassRule::threshold(10.0, 10.0);
        assert_eq!(rule.apply(-3.0), 0.0);
        assert_eq!(rule.apply(4.0), 4.0);
        assert_eq!(rule.apply(12.0), 10.0);
    }

    #[test]
    fn test_nan_untouched() {
        assert!(ReclassRule::cropland().apply(f64::NAN).is_nan());
    }

    #[test]
    fn test_grid_reclass() {
        let grid = crate::raster::test_grid(3, 1, vec![1.0, 2.0, 7.0]);
        let out = grid.reclass(&ReclassRule::cropland());
        assert_eq!(out.data, vec![0.0, 2.0, 2.0]);
        assert_eq!(out.width, 3);
    }
}
