mod codec;
mod message;
