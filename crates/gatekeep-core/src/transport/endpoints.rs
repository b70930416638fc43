//! Endpoint catalogue
//!
//! Each remote operation is selected by a numeric discriminant and takes a
//! fixed set of form fields. The typed wrappers below encode those field sets;
//! what the service does with them is its own business.

use super::client::{ApiClient, RequestOutcome};
use serde::{Deserialize, Serialize};

/// Remote operation selector. Discriminant 9 is unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Endpoint {
    GetAnnouncement = 1,
    GetCoreData = 2,
    GetLatestVersion = 3,
    GetVmpAuth = 4,
    GetPurchaseLink = 5,
    GetDownloadUrl = 6,
    GetVariableData = 7,
    CheckUserStatus = 8,
    UserRegister = 10,
    UserLogin = 11,
    UserRecharge = 12,
    UserChangePassword = 13,
    UserRebind = 14,
    UserLogout = 15,
    TrialSoftware = 16,
    SingleCodeLogin = 17,
    BanUser = 18,
    SetUserData = 19,
    AddBlacklist = 20,
    GetSpecificData = 21,
    GetUserDetails = 22,
    GetRechargeInfo = 23,
    GetExpiryTime = 24,
    GetRemainingPoints = 25,
    DeductPoints = 26,
    GetVersionData = 27,
}

impl Endpoint {
    pub const ALL: [Endpoint; 26] = [
        Endpoint::GetAnnouncement,
        Endpoint::GetCoreData,
        Endpoint::GetLatestVersion,
        Endpoint::GetVmpAuth,
        Endpoint::GetPurchaseLink,
        Endpoint::GetDownloadUrl,
        Endpoint::GetVariableData,
        Endpoint::CheckUserStatus,
        Endpoint::UserRegister,
        Endpoint::UserLogin,
        Endpoint::UserRecharge,
        Endpoint::UserChangePassword,
        Endpoint::UserRebind,
        Endpoint::UserLogout,
        Endpoint::TrialSoftware,
        Endpoint::SingleCodeLogin,
        Endpoint::BanUser,
        Endpoint::SetUserData,
        Endpoint::AddBlacklist,
        Endpoint::GetSpecificData,
        Endpoint::GetUserDetails,
        Endpoint::GetRechargeInfo,
        Endpoint::GetExpiryTime,
        Endpoint::GetRemainingPoints,
        Endpoint::DeductPoints,
        Endpoint::GetVersionData,
    ];

    /// Wire value of the `type` field
    pub fn discriminant(self) -> u8 {
        self as u8
    }

    pub fn from_discriminant(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.discriminant() == value)
    }
}

impl ApiClient {
    // ========================================================================
    // Metadata
    // ========================================================================

    pub async fn get_announcement(&self) -> RequestOutcome {
        self.execute(self.request().endpoint(Endpoint::GetAnnouncement))
            .await
    }

    pub async fn get_core_data(&self, user_name: &str, token: &str) -> RequestOutcome {
        self.execute(
            self.request()
                .endpoint(Endpoint::GetCoreData)
                .field("UserName", user_name)
                .field("Token", token),
        )
        .await
    }

    pub async fn get_latest_version(&self) -> RequestOutcome {
        self.execute(self.request().endpoint(Endpoint::GetLatestVersion))
            .await
    }

    pub async fn get_vmp_authorization(
        &self,
        user_name: &str,
        token: &str,
        vmp_mac: &str,
    ) -> RequestOutcome {
        self.execute(
            self.request()
                .endpoint(Endpoint::GetVmpAuth)
                .field("UserName", user_name)
                .field("Token", token)
                .field("VmpMac", vmp_mac),
        )
        .await
    }

    pub async fn get_purchase_link(&self) -> RequestOutcome {
        self.execute(self.request().endpoint(Endpoint::GetPurchaseLink))
            .await
    }

    pub async fn get_download_url(&self) -> RequestOutcome {
        self.execute(self.request().endpoint(Endpoint::GetDownloadUrl))
            .await
    }

    pub async fn get_variable_data(
        &self,
        user_name: &str,
        token: &str,
        variable_id: &str,
        variable_name: &str,
    ) -> RequestOutcome {
        self.execute(
            self.request()
                .endpoint(Endpoint::GetVariableData)
                .field("UserName", user_name)
                .field("Token", token)
                .field("VariableId", variable_id)
                .field("VariableName", variable_name),
        )
        .await
    }

    pub async fn get_version_data(&self, user_name: &str, token: &str) -> RequestOutcome {
        self.execute(
            self.request()
                .endpoint(Endpoint::GetVersionData)
                .field("UserName", user_name)
                .field("Token", token)
                .field("Version", self.version()),
        )
        .await
    }

    // ========================================================================
    // Account lifecycle
    // ========================================================================

    /// Healthy sessions answer with the payload `1`
    pub async fn check_user_status(&self, user_name: &str, token: &str) -> RequestOutcome {
        self.execute(
            self.request()
                .endpoint(Endpoint::CheckUserStatus)
                .field("UserName", user_name)
                .field("Token", token),
        )
        .await
    }

    pub async fn user_register(
        &self,
        user_name: &str,
        password: &str,
        super_password: &str,
        card_password: &str,
        recommender: Option<&str>,
    ) -> RequestOutcome {
        self.execute(
            self.request()
                .endpoint(Endpoint::UserRegister)
                .field("UserName", user_name)
                .field("UserPwd", password)
                .field("SupPwd", super_password)
                .field("CardPwd", card_password)
                .field("Mac", self.mac())
                .optional("Recommender", recommender),
        )
        .await
    }

    /// Returns the bearer token on success
    pub async fn user_login(&self, user_name: &str, password: &str) -> RequestOutcome {
        self.execute(
            self.request()
                .endpoint(Endpoint::UserLogin)
                .field("UserName", user_name)
                .field("UserPwd", password)
                .field("Version", self.version())
                .field("Mac", self.mac()),
        )
        .await
    }

    pub async fn user_change_password(
        &self,
        user_name: &str,
        super_password: &str,
        new_password: &str,
    ) -> RequestOutcome {
        self.execute(
            self.request()
                .endpoint(Endpoint::UserChangePassword)
                .field("UserName", user_name)
                .field("SupPwd", super_password)
                .field("NewUserPwd", new_password),
        )
        .await
    }

    /// Move an account binding; `rebind_type` is 1 for machine code, 2 for IP
    pub async fn user_rebind(
        &self,
        user_name: &str,
        password: Option<&str>,
        rebind_type: u8,
        new_mac: &str,
    ) -> RequestOutcome {
        self.execute(
            self.request()
                .endpoint(Endpoint::UserRebind)
                .field("UserName", user_name)
                .optional("UserPwd", password)
                .field("Type", rebind_type)
                .field("Mac", new_mac),
        )
        .await
    }

    pub async fn user_logout(&self, user_name: &str, token: &str) -> RequestOutcome {
        self.execute(
            self.request()
                .endpoint(Endpoint::UserLogout)
                .field("UserName", user_name)
                .field("Token", token),
        )
        .await
    }

    pub async fn trial_software(&self, user_id: &str) -> RequestOutcome {
        self.execute(
            self.request()
                .endpoint(Endpoint::TrialSoftware)
                .field("Userid", user_id)
                .field("Version", self.version()),
        )
        .await
    }

    /// Returns the bearer token on success
    pub async fn single_code_login(&self, card: &str) -> RequestOutcome {
        self.execute(
            self.request()
                .endpoint(Endpoint::SingleCodeLogin)
                .field("Card", card)
                .field("Version", self.version())
                .field("Mac", self.mac()),
        )
        .await
    }

    pub async fn ban_user(&self, user_name: &str, password: Option<&str>) -> RequestOutcome {
        self.execute(
            self.request()
                .endpoint(Endpoint::BanUser)
                .field("UserName", user_name)
                .optional("UserPwd", password),
        )
        .await
    }

    pub async fn set_user_data(&self, user_name: &str, token: &str, data: &str) -> RequestOutcome {
        self.execute(
            self.request()
                .endpoint(Endpoint::SetUserData)
                .field("UserName", user_name)
                .field("Token", token)
                .field("Data", data),
        )
        .await
    }

    pub async fn get_specific_data(&self, user_name: &str, token: &str, data_type: u32) -> RequestOutcome {
        self.execute(
            self.request()
                .endpoint(Endpoint::GetSpecificData)
                .field("UserName", user_name)
                .field("Token", token)
                .field("Type", data_type),
        )
        .await
    }

    pub async fn get_user_details(&self, user_name: &str, password: Option<&str>) -> RequestOutcome {
        self.execute(
            self.request()
                .endpoint(Endpoint::GetUserDetails)
                .field("UserName", user_name)
                .optional("UserPwd", password),
        )
        .await
    }

    pub async fn get_expiry_time(&self, user_name: &str, password: Option<&str>) -> RequestOutcome {
        self.execute(
            self.request()
                .endpoint(Endpoint::GetExpiryTime)
                .field("UserName", user_name)
                .optional("UserPwd", password),
        )
        .await
    }

    // ========================================================================
    // Points and cards
    // ========================================================================

    pub async fn user_recharge(&self, user_name: &str, card_password: &str) -> RequestOutcome {
        self.execute(
            self.request()
                .endpoint(Endpoint::UserRecharge)
                .field("UserName", user_name)
                .field("CardPwd", card_password),
        )
        .await
    }

    pub async fn get_recharge_info(&self, user_name: &str, password: Option<&str>) -> RequestOutcome {
        self.execute(
            self.request()
                .endpoint(Endpoint::GetRechargeInfo)
                .field("UserName", user_name)
                .optional("UserPwd", password),
        )
        .await
    }

    pub async fn get_remaining_points(&self, user_name: &str, password: Option<&str>) -> RequestOutcome {
        self.execute(
            self.request()
                .endpoint(Endpoint::GetRemainingPoints)
                .field("UserName", user_name)
                .optional("UserPwd", password),
        )
        .await
    }

    pub async fn deduct_points(&self, user_name: &str, token: &str, quantity: u32) -> RequestOutcome {
        self.execute(
            self.request()
                .endpoint(Endpoint::DeductPoints)
                .field("UserName", user_name)
                .field("Token", token)
                .field("Quantity", quantity),
        )
        .await
    }

    // ========================================================================
    // Device binding
    // ========================================================================

    pub async fn add_blacklist(&self, mac: &str, reason: &str) -> RequestOutcome {
        self.execute(
            self.request()
                .endpoint(Endpoint::AddBlacklist)
                .field("Mac", mac)
                .field("Reason", reason),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminants_round_trip() {
        for endpoint in Endpoint::ALL {
            assert_eq!(Endpoint::from_discriminant(endpoint.discriminant()), Some(endpoint));
        }
        assert_eq!(Endpoint::from_discriminant(9), None);
        assert_eq!(Endpoint::from_discriminant(28), None);
    }

    #[test]
    fn discriminants_are_the_documented_ones() {
        assert_eq!(Endpoint::CheckUserStatus.discriminant(), 8);
        assert_eq!(Endpoint::UserLogin.discriminant(), 11);
        assert_eq!(Endpoint::SingleCodeLogin.discriminant(), 17);
        assert_eq!(Endpoint::GetVersionData.discriminant(), 27);
    }
}
