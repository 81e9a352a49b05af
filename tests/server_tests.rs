//! BridgeService and HTTP connection tests

#![cfg(feature = "server")]

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use world_bridge::nbt::{CompoundExt, NbtCompound};
    use world_bridge::request::{ApiRequest, ApiResponse};
    use world_bridge::server::handle_connection;
    use world_bridge::{
        decode, encode, BlockEntry, BlockPos, BlockState, BridgeConfig, BridgeService,
        CompressionHint, MemoryHost, OutputFormat, Size, StructureTemplate, Vec3, WorldRegion,
    };

    fn make_service() -> (Arc<MemoryHost>, Arc<BridgeService>) {
        let host = Arc::new(MemoryHost::default());
        let service = Arc::new(BridgeService::new(BridgeConfig::default(), host.clone()));
        (host, service)
    }

    fn make_pillar() -> StructureTemplate {
        let mut t = StructureTemplate::new(Size::new(1, 3, 1));
        for y in 0..3 {
            t.push_block(BlockEntry::new(
                BlockPos::new(0, y, 0),
                BlockState::new("quartz_pillar").with("axis", "y"),
            ))
            .unwrap();
        }
        t
    }

    fn make_barrel(name: &str) -> StructureTemplate {
        let mut t = StructureTemplate::new(Size::new(1, 1, 1));
        t.push_block(BlockEntry::new(BlockPos::ORIGIN, BlockState::new("barrel")))
            .unwrap();
        let mut data = NbtCompound::new();
        data.insert("CustomName", name);
        t.attach_auxiliary(BlockPos::ORIGIN, data).unwrap();
        t
    }

    fn json(response: &ApiResponse) -> serde_json::Value {
        serde_json::from_slice(&response.body).unwrap()
    }

    // -----------------------------------------------------------------------
    // POST /structure
    // -----------------------------------------------------------------------

    #[test]
    fn post_places_structure() {
        let (host, service) = make_service();
        let body = encode(&make_pillar(), OutputFormat::Binary { compressed: true }).unwrap();
        let request = ApiRequest::new("POST", "/structure?x=5&y=70&z=-5")
            .with_header("Content-Encoding", "gzip")
            .with_body(body);

        let response = service.handle(&request);
        assert_eq!(response.status, 200);
        assert_eq!(json(&response)["status"], true);
        let level = host.memory_level(None);
        assert_eq!(
            level.block(BlockPos::new(5, 72, -5)).unwrap().name,
            "minecraft:quartz_pillar"
        );

        // Same structure again: nothing changes.
        let again = service.handle(&request);
        assert_eq!(json(&again)["status"], false);
    }

    #[test]
    fn post_with_empty_body_is_400() {
        let (_, service) = make_service();
        let response = service.handle(&ApiRequest::new("POST", "/structure"));
        assert_eq!(response.status, 400);
        assert_eq!(json(&response)["message"], "Request body is empty");
    }

    #[test]
    fn post_with_garbage_is_400() {
        let (_, service) = make_service();
        let request = ApiRequest::new("POST", "/structure").with_body(&b"not a structure"[..]);
        let response = service.handle(&request);
        assert_eq!(response.status, 400);
        let message = json(&response)["message"].as_str().unwrap().to_string();
        assert!(message.starts_with("Could not process request body"));
    }

    #[test]
    fn post_with_bad_number_is_400() {
        let (_, service) = make_service();
        let body = encode(&make_pillar(), OutputFormat::Binary { compressed: false }).unwrap();
        let request = ApiRequest::new("POST", "/structure?rotate=half").with_body(body);
        let response = service.handle(&request);
        assert_eq!(response.status, 400);
        assert_eq!(
            json(&response)["message"],
            "Could not parse query parameter: rotate=half"
        );
    }

    #[test]
    fn post_outside_the_world_is_placement_error() {
        let (_, service) = make_service();
        let body = encode(&make_pillar(), OutputFormat::Binary { compressed: false }).unwrap();
        let request = ApiRequest::new("POST", "/structure?y=319").with_body(body);
        let response = service.handle(&request);
        assert_eq!(response.status, 400);
        let message = json(&response)["message"].as_str().unwrap().to_string();
        assert!(message.starts_with("Could not place structure"));
    }

    #[test]
    fn post_rotating_about_extreme_pivot_wraps() {
        let (host, service) = make_service();
        let body = encode(&make_pillar(), OutputFormat::Binary { compressed: false }).unwrap();
        let request =
            ApiRequest::new("POST", "/structure?rotate=1&pivotx=2147483647&pivotz=5").with_body(body);
        let response = service.handle(&request);
        assert_eq!(response.status, 200);
        let level = host.memory_level(None);
        for y in 0..3 {
            let pos = BlockPos::new(i32::MIN + 4, y, 5 - i32::MAX);
            assert_eq!(level.block(pos).unwrap().name, "minecraft:quartz_pillar");
        }
    }

    #[test]
    fn post_past_the_coordinate_edge_is_placement_error() {
        let (host, service) = make_service();
        let mut wide = StructureTemplate::new(Size::new(2, 1, 1));
        for x in 0..2 {
            wide.push_block(BlockEntry::new(BlockPos::new(x, 0, 0), BlockState::new("stone")))
                .unwrap();
        }
        let body = encode(&wide, OutputFormat::Binary { compressed: false }).unwrap();
        let request = ApiRequest::new("POST", "/structure?x=2147483647").with_body(body);
        let response = service.handle(&request);
        assert_eq!(response.status, 400);
        let message = json(&response)["message"].as_str().unwrap().to_string();
        assert!(message.starts_with("Could not place structure"));
        let level = host.memory_level(None);
        assert_eq!(
            level.block(BlockPos::new(i32::MAX, 0, 0)).unwrap().name,
            "minecraft:stone"
        );
    }

    #[test]
    fn unchanged_post_leaves_block_entity_alone() {
        let (host, service) = make_service();
        let body = encode(&make_barrel("stash"), OutputFormat::Binary { compressed: false }).unwrap();
        let request = ApiRequest::new("POST", "/structure?x=3&y=3&z=3").with_body(body);
        assert_eq!(json(&service.handle(&request))["status"], true);

        let level = host.memory_level(None);
        let pos = BlockPos::new(3, 3, 3);
        assert_eq!(
            level.block_entity(pos).unwrap().unwrap().get_str("CustomName"),
            Some("stash")
        );
        let mut edited = NbtCompound::new();
        edited.insert("CustomName", "emptied");
        level.set_block_entity(pos, edited).unwrap();

        assert_eq!(json(&service.handle(&request))["status"], false);
        assert_eq!(
            level.block_entity(pos).unwrap().unwrap().get_str("CustomName"),
            Some("emptied")
        );
    }

    #[test]
    fn post_into_named_dimension() {
        let (host, service) = make_service();
        let body = encode(&make_pillar(), OutputFormat::Binary { compressed: false }).unwrap();
        let request = ApiRequest::new("POST", "/structure?dimension=the_nether").with_body(body);
        assert_eq!(service.handle(&request).status, 200);
        assert_eq!(host.memory_level(Some("nether")).block_count(), 3);
        assert_eq!(host.memory_level(None).block_count(), 0);
    }

    // -----------------------------------------------------------------------
    // GET /structure
    // -----------------------------------------------------------------------

    #[test]
    fn get_returns_compressed_binary_by_default() {
        let (_, service) = make_service();
        let body = encode(&make_pillar(), OutputFormat::Binary { compressed: false }).unwrap();
        service.handle(&ApiRequest::new("POST", "/structure?x=1&y=1&z=1").with_body(body));

        let response = service.handle(&ApiRequest::new("GET", "/structure?x=1&y=1&z=1&dy=3"));
        assert_eq!(response.status, 200);
        assert_eq!(response.header("Content-Encoding"), Some("gzip"));
        assert_eq!(response.header("Content-Type"), Some("application/octet-stream"));
        let captured = decode(&response.body, CompressionHint::Gzip).unwrap();
        assert_eq!(captured.blocks(), make_pillar().blocks());
    }

    #[test]
    fn get_with_corner_past_the_edge_is_400() {
        let (_, service) = make_service();
        let response = service.handle(&ApiRequest::new("GET", "/structure?x=2147483647&dx=1"));
        assert_eq!(response.status, 400);
        let message = json(&response)["message"].as_str().unwrap().to_string();
        assert!(message.starts_with("Could not parse query parameter: "));
    }

    #[test]
    fn get_with_extreme_delta_is_too_large() {
        let (_, service) = make_service();
        let response = service.handle(&ApiRequest::new("GET", "/structure?dx=-2147483648"));
        assert_eq!(response.status, 400);
        let message = json(&response)["message"].as_str().unwrap().to_string();
        assert!(message.starts_with("Capture of 2147483648 blocks exceeds the limit"));
    }

    #[test]
    fn capture_volume_limit_is_configurable() {
        let host = Arc::new(MemoryHost::default());
        let config = BridgeConfig {
            max_capture_volume: 8,
            ..BridgeConfig::default()
        };
        let service = BridgeService::new(config, host);
        let fits = service.handle(&ApiRequest::new("GET", "/structure?dx=2&dy=2&dz=2"));
        assert_eq!(fits.status, 200);
        let over = service.handle(&ApiRequest::new("GET", "/structure?dx=3&dy=3&dz=1"));
        assert_eq!(over.status, 400);
        assert_eq!(
            json(&over)["message"],
            "Capture of 9 blocks exceeds the limit of 8"
        );
    }

    #[test]
    fn get_honours_accept_headers() {
        let (_, service) = make_service();
        let raw = service.handle(
            &ApiRequest::new("GET", "/structure").with_header("Accept-Encoding", "identity"),
        );
        assert!(raw.header("Content-Encoding").is_none());
        assert!(decode(&raw.body, CompressionHint::Unknown).is_ok());

        let text = service.handle(&ApiRequest::new("GET", "/structure").with_header("Accept", "text/plain"));
        assert!(text.header("Content-Type").unwrap().starts_with("text/plain"));
        assert!(String::from_utf8(text.body).unwrap().contains("minecraft:air"));
    }

    // -----------------------------------------------------------------------
    // Other routes
    // -----------------------------------------------------------------------

    #[test]
    fn players_lists_roster() {
        let (host, service) = make_service();
        host.register_player("steve", Vec3::new(1.0, 64.0, 2.0));
        let response = service.handle(&ApiRequest::new("GET", "/players"));
        assert_eq!(response.status, 200);
        let body = json(&response);
        assert_eq!(body[0]["name"], "steve");
        assert_eq!(body[0]["y"], 64.0);
    }

    #[test]
    fn unsupported_method_is_405() {
        let (_, service) = make_service();
        for (method, path) in [("PUT", "/structure"), ("DELETE", "/structure"), ("POST", "/players")] {
            let response = service.handle(&ApiRequest::new(method, path));
            assert_eq!(response.status, 405, "{} {}", method, path);
        }
    }

    #[test]
    fn unknown_path_is_404_with_cors() {
        let (_, service) = make_service();
        let response = service.handle(&ApiRequest::new("GET", "/blocks"));
        assert_eq!(response.status, 404);
        assert_eq!(response.header("Access-Control-Allow-Origin"), Some("*"));
    }

    #[test]
    fn stats_count_requests() {
        let (_, service) = make_service();
        service.handle(&ApiRequest::new("GET", "/structure"));
        service.handle(&ApiRequest::new("POST", "/structure"));
        let stats = service.stats();
        assert_eq!(stats.requests, 2);
        assert_eq!(stats.captures, 1);
        assert_eq!(stats.failures, 1);
    }

    // -----------------------------------------------------------------------
    // HTTP over a byte stream
    // -----------------------------------------------------------------------

    async fn round_trip(service: Arc<BridgeService>, raw: Vec<u8>) -> String {
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        let task = tokio::spawn(handle_connection(server, service));
        client.write_all(&raw).await.unwrap();
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        task.await.unwrap().unwrap();
        String::from_utf8_lossy(&out).into_owned()
    }

    #[test]
    fn connection_serves_players() {
        let (host, service) = make_service();
        host.register_player("alex", Vec3::new(0.0, 0.0, 0.0));
        let raw = b"GET /players HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n".to_vec();
        let text = tokio_test::block_on(round_trip(service, raw));
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("access-control-allow-origin: *"));
        assert!(text.ends_with(r#"[{"name":"alex","x":0.0,"y":0.0,"z":0.0}]"#));
    }

    #[test]
    fn connection_places_posted_structure() {
        let (host, service) = make_service();
        let body = encode(&make_pillar(), OutputFormat::Binary { compressed: true }).unwrap();
        let mut raw = format!(
            "POST /structure?x=3 HTTP/1.1\r\nContent-Encoding: gzip\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        raw.extend_from_slice(&body);

        let text = tokio_test::block_on(round_trip(service, raw));
        assert!(text.ends_with(r#"{"status":true}"#));
        assert_eq!(host.memory_level(None).block_count(), 3);
    }

    #[test]
    fn oversized_body_is_413() {
        let host = Arc::new(MemoryHost::default());
        let config = BridgeConfig {
            max_body_bytes: 8,
            ..BridgeConfig::default()
        };
        let service = Arc::new(BridgeService::new(config, host));
        let raw = b"POST /structure HTTP/1.1\r\nContent-Length: 100\r\n\r\n".to_vec();
        let text = tokio_test::block_on(round_trip(service, raw));
        assert!(text.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
    }

    #[test]
    fn malformed_request_line_is_400() {
        let (_, service) = make_service();
        let raw = b"HELLO\r\n\r\n".to_vec();
        let text = tokio_test::block_on(round_trip(service, raw));
        assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }
}
