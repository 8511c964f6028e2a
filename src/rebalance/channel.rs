use crate::lightning::node::ChannelSummary;

/// First channel whose counterparty is `peer_pubkey`. Channel health is not checked.
pub fn find_channel<'a>(
    peer_pubkey: &str,
    channels: &'a [ChannelSummary],
) -> Option<&'a ChannelSummary> {
    channels.iter().find(|c| c.remote_pubkey == peer_pubkey)
}

pub fn channel_info(channel: &ChannelSummary) -> String {
    format!(
        "capacity={} local_balance={} remote_balance={} active={}",
        channel.capacity_msat(),
        channel.local_balance_msat,
        channel.remote_balance_msat,
        channel.active
    )
}

/// Logs every known channel for routing diagnostics.
pub fn log_channels(channels: &[ChannelSummary]) {
    tracing::info!(
        total_channels = channels.len(),
        "available channels for routing diagnostics"
    );
    for c in channels {
        tracing::info!(
            remote_pubkey = %c.remote_pubkey,
            channel_id = %c.channel_id,
            capacity_msat = c.capacity_msat(),
            local_balance = c.local_balance_msat,
            remote_balance = c.remote_balance_msat,
            spendable = c.spendable_msat,
            active = c.active,
            public = c.public,
            is_outbound = c.is_outbound,
            "channel"
        );
    }
}
