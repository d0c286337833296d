//! Addressable storage interface.

/// Interface to addressable storage, used by the execution thread.
///
/// Generalized over address and value types so machines with different
/// native widths (byte buses, word buses) can implement it the same way.
/// The bus handles whatever routing and backpressure its concrete type
/// needs (a cache fill, a blocking write) behind `read`/`write`.
pub trait Bus {
    /// The address type this bus is indexed by.
    type Address;
    /// The value type stored at each address.
    type Value;

    /// Read the value at the given address.
    fn read(&mut self, address: Self::Address) -> Self::Value;

    /// Write a value to the given address.
    fn write(&mut self, address: Self::Address, value: Self::Value);
}
