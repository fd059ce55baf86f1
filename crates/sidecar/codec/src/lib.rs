#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod error;
pub use error::{DecodeError, DecodeErrorCause, StreamFileError};

mod file;
pub use file::{
    DecodeLimits, DecodedFile, FRAME_PREFIX_SIZE, HEADER_SIZE, MAGIC, VERSION, decode_stream_file,
    encode_stream_file, read_stream_file, write_stream_file,
};
