pub mod multipart_server;
