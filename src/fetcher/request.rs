use crate::chunk::ChunkSpec;
use crate::Target;

/// Build the GET request for one chunk
///
/// The `Range` header is only present when the chunk carries a byte range,
/// the connection is always closed by the server once the body is sent.
pub(crate) fn format_request(target: &Target, spec: &ChunkSpec) -> String {
    let mut req = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\n",
        target.path(),
        target.server()
    );
    if let Some(range) = &spec.range {
        req.push_str(&format!("Range: {}\r\n", range.header_value()));
    }
    req.push_str("Connection: close\r\n\r\n");
    req
}
