/// Command buffer creation info

/// Descriptor for beginning a command-buffer recording
///
/// Currently carries no options; it exists so recording can grow settings
/// without changing the `begin_command_buffer` signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandBufferInfo;
