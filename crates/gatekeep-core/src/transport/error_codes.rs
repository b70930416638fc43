//! Fixed table of application error codes returned by the service.
//!
//! Codes are looked up by their wire form, leading `-` included. The table is
//! compiled in and never changes at runtime.

/// Look up the message for a wire error code
pub fn lookup(code: &str) -> Option<&'static str> {
    let message = match code {
        // Core service
        "-81001" => "Interface does not exist, check the endpoint address",
        "-81003" => "Software service is suspended, contact the administrator",
        "-81004" => "Software does not exist, check the software identifier",
        "-81005" => "Software is disabled, use the latest version",
        "-81006" => "Version does not exist, check for updates",
        "-81007" => "Interface password is wrong, contact the developer",
        "-81008" => "This software does not allow moving account bindings",
        "-81009" => "This is the free edition, upgrade to the paid edition",
        "-81010" => "Version is disabled, download the latest version",
        "-81011" => "Version number must be numeric",
        "-81012" => "Trial is not available",
        "-81015" => "Too many requests, try again in 10 minutes",
        "-81016" => "Too many requests from this IP, try again later",
        "-81017" => "Request data must be submitted encrypted",
        "-81018" => "Variable does not exist, check the variable id",
        "-81019" => "Variable id must be numeric",
        "-81020" => "Variable alias may only contain letters and digits",
        "-81021" => "Wrong calling convention, check the request parameters",
        "-81022" => "Malformed machine code (at most 32 letters or digits)",
        "-81023" => "Not logged in, or the account was forced offline",
        "-81024" => "Points to deduct must be greater than zero",
        "-81025" => "Card type does not match the software billing mode",
        "-81026" => "Points cannot be deducted under time-based billing",
        "-81027" => "Device is already blacklisted",
        "-81028" => "Account is logged in on another device, try again in 10 minutes",
        "-81029" => "Account is logged in from another IP, try again in 10 minutes",
        "-81030" => "Concurrent login limit exceeded",
        "-81031" => "Account is already logged in on another device",
        "-81032" => "Malformed token (16 letters or digits)",
        "-81033" => "Malformed user name or code (6-16 letters or digits)",
        "-81035" => "Unbind type must be 1 (machine code) or 2 (IP)",
        "-81036" => "Insufficient points",
        "-81037" => "This version has expired, please update",
        "-81039" => "Device is blacklisted",
        "-81040" => "Status checks too frequent, the interval must be at least 3 minutes",
        "-81042" => "Cloud data exceeds the maximum length",
        "-81043" => "Ban reason is too long",
        "-81044" => "Blacklist reason is too long",
        "-81045" => "VMP authorization key is misconfigured",
        "-81047" => "Malformed VMP machine code (10-200 characters)",
        "-81048" => "VMP authorization failed",
        "-81049" => "Failed to fetch the requested data",
        "-81060" => "Maximum number of activated users exceeded",

        // Single-code cards
        "-83001" => "Card does not exist, check your input",
        "-83002" => "Malformed card (16 characters required)",
        "-83003" => "Card is locked",
        "-83004" => "Card type does not match the software billing mode",
        "-83005" => "Single-use cards can be used once per device",
        "-83006" => "Card has expired",
        "-83007" => "Card has insufficient points",
        "-83008" => "Not used on the bound device",
        "-83009" => "Not used from the bound IP address",
        "-83011" => "Card rebind limit exceeded",
        "-83012" => "Card has insufficient credit",
        "-83013" => "Card is not activated",
        "-83014" => "Current IP matches the bound IP, no rebind needed",
        "-83015" => "Current device matches the bound device, no rebind needed",
        "-83016" => "Card would expire immediately after rebinding",
        "-83017" => "Card points would become negative after rebinding",
        "-83018" => "Card or trial feature does not exist or is banned",

        // Accounts
        "-82001" => "User does not exist",
        "-82002" => "Malformed user name (6-16 letters or digits)",
        "-82003" => "Malformed password (6-16 letters or digits)",
        "-82004" => "Malformed super password",
        "-82005" => "User name is already registered",
        "-82006" => "Account is locked",
        "-82007" => "Account has expired",
        "-82008" => "User has insufficient points",
        "-82009" => "Not logged in on the bound device",
        "-82010" => "Not logged in from the bound IP",
        "-82011" => "Registration limit exceeded",
        "-82012" => "Rebind limit exceeded",
        "-82013" => "User has insufficient credit",
        "-82014" => "Current IP matches the bound IP",
        "-82015" => "Current device matches the bound device",
        "-82016" => "Registration is closed",
        "-82017" => "Registration requires a card",
        "-82018" => "Wrong super password",
        "-82019" => "Account would expire immediately after rebinding",
        "-82020" => "Account points would become negative after rebinding",
        "-82021" => "Wrong user name or password",
        "-82022" => "Malformed referrer",
        "-82023" => "User limit reached",
        "-82024" => "Account is abnormal, contact support",

        // Recharge
        "-84001" => "Malformed recharge card (16 characters required)",
        "-84002" => "Recharge card does not exist",
        "-84003" => "Recharge card has already been used",
        "-84004" => "Recharge card is locked",
        "-84005" => "Single-use recharge cards are limited to one per user",

        // Trial
        "-85001" => "Insufficient trial credit",
        "-85002" => "Trial feature does not exist",
        "-85003" => "Trial feature is locked",
        "-85004" => "No trial data",
        "-85005" => "Trial has expired",
        "-85006" => "Insufficient trial points",
        "-85007" => "Malformed trial feature",

        _ => return None,
    };
    Some(message)
}

/// Human-readable message for a wire error code, synthesized for unknown codes
pub fn decode(code: &str) -> String {
    lookup(code)
        .map(str::to_string)
        .unwrap_or_else(|| format!("unknown error code: {}", code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_code_decodes_to_table_message() {
        let message = decode("-81001");
        assert!(message.to_lowercase().contains("interface does not exist"));
    }

    #[test]
    fn unknown_code_is_synthesized() {
        let message = decode("-99999");
        assert!(message.contains("-99999"));
        assert!(message.contains("unknown error code"));
    }

    #[test]
    fn every_subsystem_is_covered() {
        for code in ["-81030", "-83006", "-82021", "-84003", "-85005"] {
            assert!(lookup(code).is_some(), "missing {}", code);
        }
    }

    #[test]
    fn lookup_requires_wire_form() {
        assert!(lookup("81001").is_none());
        assert!(lookup(" -81001").is_none());
    }
}
