pub mod null;
