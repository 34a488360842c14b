//! Protobuf messages of `rpcbench.test.BenchmarkService`.

#[derive(Clone, PartialEq, prost::Message)]
pub struct SimpleRequest {
    #[prost(int32, tag = "1")]
    pub response_size: i32,
    #[prost(bytes = "bytes", tag = "2")]
    pub payload: bytes::Bytes,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SimpleResponse {
    /// Server wall clock at the time the response was produced.
    #[prost(int64, tag = "1")]
    pub server_timestamp_unix_nanos: i64,
    #[prost(bytes = "bytes", tag = "2")]
    pub payload: bytes::Bytes,
}
