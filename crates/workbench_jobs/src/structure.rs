use std::io::Read;

use crate::{JobMonitor, ParseError};

/// Builds the displayable structure from an opened resource.
///
/// Runs on a job thread. `Ok(None)` means the resource holds nothing to
/// display; the view then keeps what it already shows.
pub trait StructureBuilder: Send + Sync {
    type Structure: Send + 'static;

    fn build(
        &self,
        stream: &mut dyn Read,
        monitor: &JobMonitor,
    ) -> Result<Option<Self::Structure>, ParseError>;
}
