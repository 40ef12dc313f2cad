/// Display version information
pub fn execute() {
    println!("gatekeeper {}", env!("CARGO_PKG_VERSION"));
    println!("Cross-server moderation relay");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_execute() {
        // Version command should not panic
        execute();
    }
}
