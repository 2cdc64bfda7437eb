//! The GEARHASH rolling-hash table (§4.2): 256 64-bit words, one per
//! possible input byte value. Fixed by the algorithm suite -- deployment
//! global, never negotiated. Reproduced exactly here so that chunk
//! boundaries are bit-identical with any other conforming implementation
//! sharing this table.

pub(crate) const GEAR: [u64; 256] = [
    0xc581671779f208b5, 0x38cd0e40cf092ea3, 0x83aa1311dd03d85f, 0x5d57c85a3fee911c,
    0x269968b5a60ce0c6, 0x6fe35d4f2c4e1450, 0x027d4b60d6d179ea, 0x242a47cfc92886a3,
    0x29143a66835b381f, 0x300e2f6d8d3c9cc6, 0x4e4feb85fce56c45, 0xec56267472adac98,
    0xa5c55142397e4067, 0x0af5c365c09312d3, 0xee27ffeb23259a0d, 0x8da5a268d5456752,
    0xdf08a3bca20a5def, 0xf86af9dc912a2a04, 0xd839921f75e6fdf5, 0x51c570fe2d48bd7c,
    0xa9fddc78c6631821, 0x7516f4735cd94ca3, 0xe169b5c6ce5c6dba, 0x6a13700cdc36e005,
    0x8f5823494b196427, 0x23babcdaa242ee36, 0xfc1a1dd5646c9c13, 0xf0d9d8ac23f8bf26,
    0xfa1c5193be74c661, 0x9df437f7e12164ec, 0xd5bc9adc0e156be4, 0xbd17a88c82deaca2,
    0xf63cca5466f0a7b6, 0x19220b188816c2fd, 0x9e884ea781aab5c2, 0xdb30fc2cfc950fa3,
    0x4ff64023878a9066, 0x5dfba6f6a79215b4, 0x47e70a7b885ba224, 0x855ee4d8d72ac066,
    0x5a02eabc19810b0b, 0x68c5af08ce199488, 0x347de30513bdc765, 0x6e55d22728bb9451,
    0xde88f8d9797ac1e8, 0xa0017a66ce0bc956, 0xd849e23a01c6d0c4, 0x41efec15ae2357fd,
    0x8cc46f0d4cfa2ab3, 0x7b3f00aa93d1c7ea, 0x7dbf8a0403611642, 0xef8578b0c66374f0,
    0x0c26ac9d23599106, 0xf350b6a876f85660, 0xacdd5beabadecbd3, 0x57fce15a73fa7b32,
    0x4d6c6c7fc6e33cc9, 0x300821a0cca1df05, 0xe59083e0295ed9f4, 0xc78f83ea9a25e776,
    0x3b0a055f2aa3119a, 0xa289f676248860a5, 0x49098cb6cfa93b61, 0x093a53c2886890f0,
    0xacafcd29d54f6483, 0xf427bc0fb50aabae, 0xd4938a6520888748, 0x9d1a23b4cd15b173,
    0x28c0f09cf6364a72, 0x4e913880461ab5a0, 0x5c8d2eb8acb90a3c, 0x907631e7c2b681ae,
    0x02e4d6793f8b3e6b, 0x220dc54278e3b43a, 0x3bb038b5cde93cc8, 0xac5b9cdfe3bc17f2,
    0xe619ab2216f76b5c, 0x82445e08d1ba85a6, 0x8041a99766ca5a6c, 0x0ee386ab84a42ac6,
    0xbf79dbe9bbd8c992, 0x1840d22c3ecc1dcf, 0x0bdb17074d3cea78, 0x7b05dff0f42f8740,
    0x68d69f3c3ae2a69b, 0xeeae5b91de2384c8, 0xb4539d57b69818cf, 0x0408ca30f2832e09,
    0x4047222d3cdc57d9, 0x7d10887f1dea52e6, 0x17d63c001148e779, 0x6483f28ef805f328,
    0x7421a6b87562b694, 0x0809194b3846a760, 0xc0af8a8e61951f25, 0x4db56d34f25cd0f3,
    0x24b7c801a6ba38b3, 0x01096503cde1d70d, 0xaf6da162f2223426, 0x84d559c39fd35712,
    0xbda46f926e6a8b91, 0x361fddb29db13455, 0x65a205d3d3ab4265, 0xafc643de1307042f,
    0x1b29d08b54897553, 0xe07f910e2bc4fc83, 0xd040806776f3a5f8, 0xf67fac524951873a,
    0xe481df7546a0428e, 0x82a90e4f47bca91f, 0xd4fc8a5b00417020, 0x0763d226a4712ce1,
    0x9968ae76a439a4be, 0xa79941e98a636b99, 0x6fc9f6e0f7e4a6ad, 0xaf7c03651b162fed,
    0x0947d1b67a4054b2, 0x21e2eb1f017ca6e7, 0x0b58ab1d373a38c0, 0x1166b2b48ce252fa,
    0xe84099bd901bcaa3, 0x75fa0c1679216c03, 0x13120b72e05bb21e, 0x18bf5e14b51a32fb,
    0x52beae09dbc24680, 0xc21132d9e2f29e67, 0xcaba12eb8c85786c, 0xf0e0031506acb07b,
    0x37be3b13b6f18904, 0xf9f6f215bd6359cd, 0x0bb1285b910cf586, 0xb136940aaaa69508,
    0x62b25189ebd5e8a1, 0x0c7d1c5c70bb2d4f, 0xb310d598b947a964, 0x2a1556a49e25eaac,
    0xd0d9d422bb38cc6f, 0x1baa597699b2a520, 0xf5ea3102c43e5850, 0x035d59acf30cd050,
    0x296814d868e6565e, 0x230cd2e4ef13dc46, 0x40b9ae9358cb83d3, 0xb2f62d5e405c94cf,
    0xf7e0d27becc92920, 0xca9c58ec43de757f, 0x010ab060da907660, 0xaf566a901bcdd01c,
    0x9900d677f7ebb4aa, 0x5c51ac78cb53c7a7, 0x151aab4c8490788c, 0xe1b5fe1fd0218315,
    0x5e4c1284e51c1c21, 0x6c843ff59ab893d6, 0xa38860c203cad3e4, 0xaf245f6bf0e50eee,
    0x4dd84e446a75effa, 0xfd924ae36b44811c, 0x7c99c9cc27b41a61, 0x10e1d9a5482338e2,
    0x773a20454ddce8d1, 0x18cebd7e35aaa4d8, 0x49274f80a1d2c87d, 0xc50ad05e33bdbc30,
    0xace0aaefe72d09c9, 0x1d30993f64679e7c, 0xe096c66e863fabcc, 0xeefc4a0a18a9c0ab,
    0x4610544ce8bf7b8e, 0xfe941c1d53b9e801, 0x1a676c9e53457fec, 0x861cd24b8d9625fb,
    0xccc84f809cb3a7dc, 0xb6f719fd32b4aaec, 0x3785dedf2b0b70f5, 0xc65c16fc808e68f2,
    0x3ec33b92a33eaac0, 0xdf9b0fb3049a7c8c, 0xd6487dff0976056b, 0x91b9cc5b9da03a92,
    0xbc8a006869af99bc, 0x142aeb1a4fce8c15, 0xbc40d9ff41dac925, 0x7fd278eb6d4e2553,
    0x6f93f3bacddeacc3, 0x9beefba7f1efc9a2, 0xd1ec84df434f9b0e, 0x12745ca9c22d6cda,
    0xd5e6805a5752ee18, 0x19ded3fe7441858f, 0x6e2e6e2e1ce2e62d, 0xa1cf4bd964e5772b,
    0x4125479bd30c9fcb, 0x03dbac8db8979943, 0x4fa9e9a7246ffea9, 0x1a7af8dbd925321d,
    0xb91b0bd4ad9f6b51, 0xabae268c9884898c, 0x9a49f29a87d372b4, 0xb50c5c823112f6dd,
    0xf5ad5aa3380cf2ea, 0xfa655f76f9ae4601, 0x7a282f75e89996f8, 0xb3ae257a27010440,
    0x3edd26b2e9c3c56f, 0xc131e20aedf0af9e, 0xdfdb26f0f5ab5319, 0x16ba9681ef346f53,
    0x8d0a257f7a03ac21, 0x8405891a1333f1bf, 0xdd1a07f6afee5ceb, 0xd49ae075879af62f,
    0xa0d9382e523fc147, 0xfcc69bc9ec9b5692, 0x812f80458aacb8b8, 0xfca0d310dafdfcfe,
    0xfd400aab55b29eb5, 0x1f3876217fff2132, 0x532d02737bb9d4bd, 0x3285ed883e839e78,
    0xd672582608c083f8, 0x2b5a0643d359a402, 0xdedc50a099856275, 0xad41fbc711911866,
    0xb72fda1375b14a61, 0xf8ce83a0fe3c3ae5, 0xc089404b7f50ef9c, 0x4d2e167e7ce7209c,
    0x56cc3192c2bff7ba, 0xd77ffc1162955e9f, 0xa94a2ddfb73863cd, 0x5f5102d37dccde32,
    0xcdde1427720e9aaa, 0xbd1ed1d1d6c2ce11, 0xa91128fd2e6444df, 0x64915ec6d60db834,
    0xeed8ea637be2c1cd, 0xd629a765ba077f39, 0xeeddbda90fc3402c, 0xca5b99e0fc3d0496,
    0x0226288a12961708, 0x1dad8d0db1203d02, 0x9582695bac6b137c, 0xafe9d1ccf7d668a0,
    0x8eb47f3a05829478, 0x7fd442a6776bc398, 0xdade3d5610af8f38, 0x0f35d1f6da657171,
    0x7fbe45318cdf6db9, 0x3801c8b2af0295f6, 0xc72b422d419c9a77, 0x60a949012257b894,
    0xa26928cac096e0ed, 0x489f47b8ea95b9b2, 0xb039116b23d98d1e, 0x51849ce0c8373916,
];
