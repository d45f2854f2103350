use anyhow::Result;

/// Sizing of the dynamic vertex and index rings.
///
/// The defaults hold a full screen of 2D UI geometry several times over before
/// a flush is forced.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BatchConfig {
    /// Vertex ring capacity, in vertices.
    pub vertex_capacity: usize,
    /// Index ring capacity, in 16-bit indices.
    pub index_capacity: usize,
}

impl BatchConfig {
    /// Largest vertex ring addressable by 16-bit indices.
    pub const MAX_VERTEX_CAPACITY: usize = u16::MAX as usize + 1;

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.vertex_capacity >= 4,
            "vertex capacity {} cannot hold a single quad",
            self.vertex_capacity
        );
        anyhow::ensure!(
            self.vertex_capacity <= Self::MAX_VERTEX_CAPACITY,
            "vertex capacity {} exceeds 16-bit index range",
            self.vertex_capacity
        );
        anyhow::ensure!(
            self.index_capacity >= 6,
            "index capacity {} cannot hold a single quad",
            self.index_capacity
        );
        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            vertex_capacity: 6000,
            index_capacity: 10000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(BatchConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_vertex_capacity_beyond_u16_indices() {
        let config = BatchConfig { vertex_capacity: 70_000, ..BatchConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_tiny_rings() {
        assert!(BatchConfig { vertex_capacity: 3, index_capacity: 100 }.validate().is_err());
        assert!(BatchConfig { vertex_capacity: 100, index_capacity: 5 }.validate().is_err());
    }
}
