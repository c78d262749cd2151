pub mod origin_response;
