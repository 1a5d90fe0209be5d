pub mod rpc;

pub use rpc::{
    unify, ApiVersion, Application, JsonRpcRequest, LoginRequest, LoginResponse, NamedConstant,
    NamedConstantList, ResponsePayload,
};
