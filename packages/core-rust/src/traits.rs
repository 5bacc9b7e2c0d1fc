use http::Method;

/// What the engine needs from the surrounding HTTP host. Implemented by
/// server adapters; the engine itself never does network I/O.
pub trait HostAdapter: Send + Sync {
    /// Method of the inbound request.
    fn request_method(&self) -> Method;

    /// Raw request body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be read.
    fn read_body(&self) -> anyhow::Result<String>;

    /// Sets a response header.
    fn set_header(&self, name: &str, value: &str);

    /// Value of the `Authorization` request header, if any.
    fn authorization(&self) -> Option<String> {
        None
    }
}
