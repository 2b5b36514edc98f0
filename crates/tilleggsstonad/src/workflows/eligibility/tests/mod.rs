mod common;
mod initializer;
