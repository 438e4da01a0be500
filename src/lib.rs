pub mod isa;
pub mod codec;
pub mod machine;
pub mod engine;
pub mod assembler;
pub mod disasm;
pub mod program;
pub mod snapshot;
pub mod pipeline;
