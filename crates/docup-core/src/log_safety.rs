/// Replace control characters in an untrusted string before it is logged.
///
/// CR and LF would otherwise let a crafted filename forge extra log lines.
pub fn sanitize_for_log(input: &str) -> String {
    input
        .chars()
        .map(|c| if c.is_control() { '_' } else { c })
        .collect()
}
