use std::any::Any;
use std::sync::Arc;

use crate::container::SignalSourceContainer;

/// A unit of work attached to a container. `as_any` backs downcasting to
/// a concrete processor type where needed, in place of a dynamic cast.
pub trait DataProcessor: Send + Sync {
    fn on_attach(&self, container: Arc<dyn SignalSourceContainer>);
    fn on_detach(&self, container: Arc<dyn SignalSourceContainer>);
    fn process(&self, container: Arc<dyn SignalSourceContainer>);
    fn is_processing(&self) -> bool;
    fn as_any(&self) -> &dyn Any;
}
