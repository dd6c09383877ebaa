pub mod udp_packet_sender;
