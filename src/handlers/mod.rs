pub mod http;
pub mod map_surface;
pub mod path_cache;
pub mod position;
pub mod registration;
pub mod road_router;
pub mod route_assembler;
pub mod routing_service;
pub mod server_client;
pub mod token_store;
pub mod tracker;
pub mod tracking_loop;
