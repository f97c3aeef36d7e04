//! Streaming model protocol: wire types, session setup and outgoing turns

mod messages;
mod setup;
mod transport;
mod turn;

pub use messages::{
    Blob, ClientContent, Content, FunctionCall, FunctionResponse, GoAway, Part, RealtimeInput,
    ServerContent, ServerMessage, SessionResumptionUpdate, ToolCall, ToolResponse, Transcription,
    END_OF_TURN_EVENT,
};
pub use setup::{
    build_session_setup, canvas_tool_declaration, system_instruction, FunctionDeclaration,
    LiveConnectConfig, Modality, SessionResumption, SessionSetup, SetupParams, CANVAS_TOOL_NAME,
};
pub use transport::LiveTransport;
pub use turn::{deliver, SendOptions, SendOutcome, TurnBuilder, TurnText};
