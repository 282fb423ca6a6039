fn main() -> Result<(), Box<dyn std::error::Error>> {
    let protoc = protoc_bin_vendored::protoc_bin_path().map_err(|e| e.to_string())?;
    std::env::set_var("PROTOC", protoc);

    println!("cargo:rerun-if-changed=proto/order_service.proto");

    // Messages render with the protobuf JSON names, which is what HTTP callers see.
    tonic_build::configure()
        .build_server(false)
        .type_attribute(".", "#[derive(serde::Serialize, serde::Deserialize)]")
        .type_attribute(".", "#[serde(rename_all = \"camelCase\", default)]")
        .field_attribute(
            "tradeflow.order.SubmitOrderRequest.order_type",
            "#[serde(rename = \"type\")]",
        )
        .compile_protos(&["proto/order_service.proto"], &["proto"])?;
    Ok(())
}
