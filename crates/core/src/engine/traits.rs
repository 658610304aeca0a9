//! Trait definitions for the engine module.

use async_trait::async_trait;

use super::error::EngineError;
use super::events::EngineSubscription;

/// An external media engine driven through an argument vector.
///
/// The engine owns a virtual filesystem keyed by plain file names. Inputs are
/// written into it before `execute`, outputs are read back afterwards. No
/// operation is retried internally.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Returns the name of this engine implementation.
    fn name(&self) -> &str;

    /// Fetches and initializes the engine resources.
    async fn load(&self, core_location: &str, wasm_location: &str) -> Result<(), EngineError>;

    /// Whether `load` has completed successfully.
    async fn is_loaded(&self) -> bool;

    /// Runs the engine with the given arguments and returns its exit code.
    async fn execute(&self, argv: &[String]) -> Result<i32, EngineError>;

    /// Writes a file into the virtual filesystem.
    async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), EngineError>;

    /// Reads a file from the virtual filesystem.
    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError>;

    /// Removes a file from the virtual filesystem.
    async fn delete_file(&self, name: &str) -> Result<(), EngineError>;

    /// Subscribes to progress and log events.
    ///
    /// Events emitted before the subscription is opened are not delivered.
    fn subscribe(&self) -> EngineSubscription;
}
