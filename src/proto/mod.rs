// Generated by tonic-build from proto/ at build time

pub mod common {
    tonic::include_proto!("campus.common");
}

pub mod auth {
    tonic::include_proto!("campus.auth");
}

pub mod items {
    tonic::include_proto!("campus.items");
}

pub mod health {
    tonic::include_proto!("grpc.health.v1");
}

pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("campus_descriptor");
